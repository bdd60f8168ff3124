//! Typed data exchanged by the check-in operations.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Action, RequestParameters};

// ============================================================================
// CheckIn
// ============================================================================

/// Visitor details submitted with a check-in.
///
/// Missing fields go over the wire as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    /// Visitor name.
    pub name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Company or affiliation.
    pub company: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
}

impl CheckIn {
    /// Creates a check-in with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Builds the `checkin` parameter set.
    #[must_use]
    pub fn to_params(&self) -> RequestParameters {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();

        RequestParameters::for_action(Action::Checkin)
            .with("name", field(&self.name))
            .with("phone", field(&self.phone))
            .with("email", field(&self.email))
            .with("company", field(&self.company))
            .with("note", field(&self.note))
    }
}

// ============================================================================
// Record
// ============================================================================

/// One stored check-in, as returned by `getRecords`.
///
/// Sheet cells arrive as strings, numbers or `null` depending on how they
/// were typed in; every field is read back as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Record {
    /// Check-in timestamp as sent by the endpoint.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub time: String,
    /// Visitor name.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,
    /// Phone number.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub phone: String,
    /// Email address, if given.
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub email: Option<String>,
    /// Company, if given.
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub company: Option<String>,
    /// Note, if given.
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub note: Option<String>,
}

/// Reads a scalar cell as text; `null` becomes `None`.
fn deserialize_opt_text<'de, D>(deserializer: D) -> StdResult<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => {
            return Err(de::Error::custom(format!(
                "expected a scalar cell, got {other}"
            )));
        }
    })
}

/// Reads a scalar cell as text; `null` becomes the empty string.
fn deserialize_text<'de, D>(deserializer: D) -> StdResult<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_opt_text(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Stats
// ============================================================================

/// Aggregate check-in counters. Missing counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// All check-ins.
    pub total: u64,
    /// Check-ins today.
    pub today: u64,
    /// Check-ins this week.
    pub this_week: u64,
    /// Check-ins this month.
    pub this_month: u64,
}

// ============================================================================
// ExportBundle
// ============================================================================

/// CSV export produced by `exportData`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportBundle {
    /// Suggested file name.
    pub filename: String,
    /// CSV text.
    pub csv: String,
}

impl ExportBundle {
    /// Writes the CSV into `dir` under the bundle's file name.
    ///
    /// Only the final path component of `filename` is used, so a remote
    /// name cannot escape `dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `filename` has no usable file name
    /// - [`Error::Io`] if writing fails
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let name = Path::new(&self.filename).file_name().ok_or_else(|| {
            Error::invalid_argument(format!("unusable export file name: {:?}", self.filename))
        })?;

        let path = dir.as_ref().join(name);
        fs::write(&path, self.csv.as_bytes())?;

        debug!(path = %path.display(), bytes = self.csv.len(), "Export saved");
        Ok(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_checkin_params_fill_missing_fields() {
        let checkin = CheckIn {
            name: Some("Kim".into()),
            phone: Some("010".into()),
            ..Default::default()
        };

        assert_eq!(
            checkin.to_params().to_query_string(),
            "action=checkin&name=Kim&phone=010&email=&company=&note="
        );
    }

    #[test]
    fn test_stats_defaults_missing_counters() {
        let stats: Stats = serde_json::from_value(json!({"total": 5, "thisWeek": 2})).expect("parse");
        assert_eq!(
            stats,
            Stats {
                total: 5,
                today: 0,
                this_week: 2,
                this_month: 0
            }
        );
    }

    #[test]
    fn test_record_optional_fields() {
        let record: Record = serde_json::from_value(json!({
            "time": "2024-05-01T09:00:00.000Z",
            "name": "Kim",
            "phone": "010",
            "email": ""
        }))
        .expect("parse");

        assert_eq!(record.email.as_deref(), Some(""));
        assert_eq!(record.company, None);
    }

    #[test]
    fn test_record_accepts_loose_cells() {
        let records: Vec<Record> = serde_json::from_value(json!([
            {"time": "2024-05-01T09:00:00.000Z", "name": "Kim", "phone": 1012345678},
            {"time": "2024-05-01T10:00:00.000Z", "name": null, "phone": "011", "note": 42},
            {"name": "Lee"}
        ]))
        .expect("parse");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].phone, "1012345678");
        assert_eq!(records[1].name, "");
        assert_eq!(records[1].note.as_deref(), Some("42"));
        assert_eq!(records[2].time, "");
        assert_eq!(records[2].name, "Lee");
    }

    #[test]
    fn test_record_rejects_nested_cells() {
        let result = serde_json::from_value::<Record>(json!({"time": "t", "name": {"first": "Kim"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_in_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = ExportBundle {
            filename: "checkins_2024-05-01.csv".into(),
            csv: "time,name\n1,Kim\n".into(),
        };

        let path = bundle.save_in(dir.path()).expect("saved");
        assert_eq!(path, dir.path().join("checkins_2024-05-01.csv"));
        assert_eq!(fs::read_to_string(path).expect("read"), bundle.csv);
    }

    #[test]
    fn test_save_in_strips_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = ExportBundle {
            filename: "../../etc/evil.csv".into(),
            csv: String::new(),
        };

        let path = bundle.save_in(dir.path()).expect("saved");
        assert_eq!(path, dir.path().join("evil.csv"));
    }

    #[test]
    fn test_save_in_rejects_empty_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = ExportBundle {
            filename: "..".into(),
            csv: String::new(),
        };

        assert!(matches!(
            bundle.save_in(dir.path()),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
