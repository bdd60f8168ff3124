//! Type-safe identifiers for in-flight requests and transport elements.
//!
//! Newtype wrappers keep callback names, frame names and element handles
//! from being mixed up at compile time.
//!
//! | Type | Format | Used by |
//! |------|--------|---------|
//! | [`CallbackName`] | `jsonpCallback_<millis>_<token>` | Read bridge |
//! | [`FrameName`] | `postFrame_<millis>_<token>` | Write bridge |
//! | [`ElementId`] | channel-defined | Both channels |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of generated callback names.
const CALLBACK_PREFIX: &str = "jsonpCallback_";

/// Prefix of generated frame names.
const FRAME_PREFIX: &str = "postFrame_";

/// Length of the random token appended to generated names.
const TOKEN_LEN: usize = 9;

// ============================================================================
// Helpers
// ============================================================================

/// Builds `<prefix><millis>_<token>`.
///
/// Uniqueness is statistical only; collisions are never checked.
fn unique_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let token = Uuid::new_v4().simple().to_string();

    format!("{prefix}{millis}_{}", &token[..TOKEN_LEN])
}

// ============================================================================
// CallbackName
// ============================================================================

/// Name under which a read request's completion is registered.
///
/// Travels to the endpoint as the `callback` query parameter; the endpoint
/// answers with a script invoking this name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackName(String);

impl CallbackName {
    /// Generates a fresh name from the current time and a random token.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(unique_name(CALLBACK_PREFIX))
    }

    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallbackName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CallbackName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// FrameName
// ============================================================================

/// Name of a hidden frame, used as the target of its form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameName(String);

impl FrameName {
    /// Generates a fresh frame name.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(unique_name(FRAME_PREFIX))
    }

    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// ElementId
// ============================================================================

/// Handle for an element attached by a transport channel.
///
/// Channels hand these out on attach and accept them back on detach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(String);

impl ElementId {
    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&CallbackName> for ElementId {
    fn from(value: &CallbackName) -> Self {
        Self(value.0.clone())
    }
}

impl From<&FrameName> for ElementId {
    fn from(value: &FrameName) -> Self {
        Self(value.0.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashSet;

    #[test]
    fn test_callback_name_format() {
        let name = CallbackName::generate();
        let rest = name
            .as_str()
            .strip_prefix(CALLBACK_PREFIX)
            .expect("prefix present");

        let (millis, token) = rest.split_once('_').expect("two parts");
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_callback_names_are_distinct() {
        let names: FxHashSet<_> = (0..1000).map(|_| CallbackName::generate()).collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn test_frame_name_format() {
        let name = FrameName::generate();
        assert!(name.as_str().starts_with(FRAME_PREFIX));
        assert_ne!(name, FrameName::generate());
    }

    #[test]
    fn test_element_id_from_names() {
        let callback = CallbackName::from("jsonpCallback_1_a");
        let frame = FrameName::from("postFrame_1_b");

        assert_eq!(ElementId::from(&callback).as_str(), "jsonpCallback_1_a");
        assert_eq!(ElementId::from(&frame).to_string(), "postFrame_1_b");
    }
}
