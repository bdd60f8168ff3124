//! Response payloads and the endpoint envelope.
//!
//! The bridges only move [`ResponsePayload`] values around; they never look
//! inside. [`Envelope`] is the typed view the client layer decodes into.
//!
//! # Format
//!
//! Success:
//! ```json
//! { "success": true, "data": { "total": 5 } }
//! ```
//!
//! Error:
//! ```json
//! { "success": false, "error": "phone is required" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// ResponsePayload
// ============================================================================

/// Opaque JSON value passed by the endpoint to the read callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsePayload(Value);

impl ResponsePayload {
    /// Wraps a JSON value.
    #[inline]
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the payload, returning the JSON value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Decodes the payload as an [`Envelope`] with typed `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload does not match the envelope
    /// shape or `data` does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>> {
        Ok(serde_json::from_value(self.0)?)
    }
}

impl From<Value> for ResponsePayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Response shape shared by every endpoint operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    /// Whether the endpoint handled the operation.
    #[serde(default)]
    pub success: bool,

    /// Operation result (if success).
    pub data: Option<T>,

    /// Error message (if failure).
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Returns `true` if this is a success envelope.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Extracts `data`, returning error if the endpoint reported failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if `success` is `false`.
    pub fn into_result(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            let message = self.error.unwrap_or_else(|| "unknown error".to_string());
            Err(Error::remote(message))
        }
    }

    /// Like [`into_result`](Self::into_result), but `data` is required.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if `success` is `false`
    /// - [`Error::Remote`] if `data` is missing
    pub fn into_data(self) -> Result<T> {
        self.into_result()?
            .ok_or_else(|| Error::remote("response carried no data"))
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
    fn test_success_envelope() {
        let payload = ResponsePayload::new(json!({
            "success": true,
            "data": {"total": 5}
        }));

        let envelope: Envelope<Value> = payload.decode().expect("decode");
        assert!(envelope.is_success());
        assert_eq!(envelope.into_data().expect("data"), json!({"total": 5}));
    }

    #[test]
    fn test_error_envelope() {
        let payload = ResponsePayload::new(json!({
            "success": false,
            "error": "phone is required"
        }));

        let envelope: Envelope<Value> = payload.decode().expect("decode");
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Remote error: phone is required");
    }

    #[test]
    fn test_error_envelope_without_message() {
        let envelope: Envelope<Value> = ResponsePayload::new(json!({"success": false}))
            .decode()
            .expect("decode");

        assert!(envelope.into_result().unwrap_err().to_string().contains("unknown error"));
    }

    #[test]
    fn test_missing_data() {
        let envelope: Envelope<u64> = ResponsePayload::new(json!({"success": true}))
            .decode()
            .expect("decode");

        assert_eq!(envelope.clone().into_result().expect("ok"), None);
        assert!(envelope.into_data().is_err());
    }

    #[test]
    fn test_typed_data_mismatch() {
        let payload = ResponsePayload::new(json!({"success": true, "data": "oops"}));
        let result = payload.decode::<Vec<u64>>();
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_payload_is_transparent() {
        let payload = ResponsePayload::new(json!({"a": 1}));
        assert_eq!(serde_json::to_string(&payload).expect("serialize"), r#"{"a":1}"#);
    }
}
