//! Ordered request parameters.
//!
//! [`RequestParameters`] is serialized two ways:
//!
//! - into the script URL's query string (read bridge), via [`url::Url`];
//! - into hidden form fields and an urlencoded body (write bridge).

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use super::Action;

// ============================================================================
// Constants
// ============================================================================

/// Key of the operation name.
pub const ACTION_KEY: &str = "action";

// ============================================================================
// RequestParameters
// ============================================================================

/// Ordered mapping of string keys to string values.
///
/// Insertion order is preserved. Inserting an existing key replaces its
/// value in place.
///
/// # Example
///
/// ```
/// use checkin_bridge::protocol::{Action, RequestParameters};
///
/// let params = RequestParameters::for_action(Action::GetRecords)
///     .with("limit", "50");
///
/// assert_eq!(params.get("action"), Some("getRecords"));
/// assert_eq!(params.to_query_string(), "action=getRecords&limit=50");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    entries: Vec<(String, String)>,
}

// ============================================================================
// Constructors
// ============================================================================

impl RequestParameters {
    /// Creates an empty parameter set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a parameter set whose first entry is `action`.
    #[inline]
    #[must_use]
    pub fn for_action(action: Action) -> Self {
        Self::new().with(ACTION_KEY, action.as_str())
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RequestParameters {
    /// Adds or replaces a parameter.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter only when `value` is `Some`.
    #[inline]
    #[must_use]
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Adds or replaces a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RequestParameters {
    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if `key` is present.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Returns the number of parameters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ============================================================================
// Serialization
// ============================================================================

impl RequestParameters {
    /// Appends every parameter to `url`'s query, keeping existing pairs.
    pub fn append_to(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        for (key, value) in self.iter() {
            query.append_pair(key, value);
        }
    }

    /// Serializes as `application/x-www-form-urlencoded` query text.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Serializes as a form body with percent-encoded fields.
    #[must_use]
    pub fn to_form_body(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_for_action_puts_action_first() {
        let params = RequestParameters::for_action(Action::GetStats).with("x", "1");
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["action", "x"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let params = RequestParameters::new()
            .with("a", "1")
            .with("b", "2")
            .with("a", "3");

        assert_eq!(params.len(), 2);
        assert_eq!(params.to_query_string(), "a=3&b=2");
    }

    #[test]
    fn test_with_opt() {
        let params = RequestParameters::new()
            .with_opt("date", None::<String>)
            .with_opt("limit", Some("10"));

        assert!(!params.contains_key("date"));
        assert_eq!(params.get("limit"), Some("10"));
    }

    #[test]
    fn test_query_string_escapes() {
        let params = RequestParameters::new().with("name", "Kim & Lee").with("note", "a=b");
        assert_eq!(params.to_query_string(), "name=Kim+%26+Lee&note=a%3Db");
    }

    #[test]
    fn test_form_body_escapes() {
        let params = RequestParameters::new().with("name", "Kim Lee").with("email", "k@x.io");
        assert_eq!(params.to_form_body(), "name=Kim%20Lee&email=k%40x.io");
    }

    #[test]
    fn test_append_to_keeps_existing_query() {
        let mut url = Url::parse("https://example.com/exec?deployment=1").expect("url");
        RequestParameters::for_action(Action::GetStats).append_to(&mut url);
        assert_eq!(url.query(), Some("deployment=1&action=getStats"));
    }

    #[test]
    fn test_from_iterator() {
        let params: RequestParameters = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(params.get("b"), Some("2"));
    }

    proptest! {
        #[test]
        fn prop_query_string_preserves_pairs(
            pairs in proptest::collection::vec(("[a-z]{1,8}", "\\PC{0,16}"), 0..8)
        ) {
            let params: RequestParameters = pairs.iter().cloned().collect();
            let decoded: Vec<(String, String)> =
                url::form_urlencoded::parse(params.to_query_string().as_bytes())
                    .into_owned()
                    .collect();
            let expected: Vec<(String, String)> = params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}
