//! Endpoint operations carried in the `action` parameter.
//!
//! | Action | Wire name | Bridge |
//! |--------|-----------|--------|
//! | [`Action::Checkin`] | `checkin` | Read or write |
//! | [`Action::GetRecords`] | `getRecords` | Read |
//! | [`Action::GetStats`] | `getStats` | Read |
//! | [`Action::ExportData`] | `exportData` | Read |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Action
// ============================================================================

/// Operation requested from the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Record a visitor check-in.
    Checkin,
    /// Fetch check-in records.
    GetRecords,
    /// Fetch aggregate statistics.
    GetStats,
    /// Fetch an exportable CSV bundle.
    ExportData,
}

impl Action {
    /// Returns the wire name sent as the `action` parameter.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::GetRecords => "getRecords",
            Self::GetStats => "getStats",
            Self::ExportData => "exportData",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for action in [
            Action::Checkin,
            Action::GetRecords,
            Action::GetStats,
            Action::ExportData,
        ] {
            let json = serde_json::to_string(&action).expect("serialize");
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::GetStats.to_string(), "getStats");
    }
}
