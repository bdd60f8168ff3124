//! Bridge configuration and its fluent builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use checkin_bridge::BridgeConfig;
//!
//! # fn example() -> checkin_bridge::Result<()> {
//! let config = BridgeConfig::builder()
//!     .endpoint("https://script.example.com/macros/s/abc/exec")
//!     .read_timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! assert_eq!(config.write_settle, Duration::from_millis(1000));
//! # Ok(())
//! # }
//! ```
//!
//! The same options load from JSON:
//!
//! ```json
//! { "endpoint": "https://...", "readTimeoutMs": 30000, "writeSettleMs": 1000 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

use super::read::CALLBACK_KEY;

// ============================================================================
// Constants
// ============================================================================

/// Default bound on a read request (30s).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default optimistic delay after the write frame loads (1s).
pub const DEFAULT_WRITE_SETTLE: Duration = Duration::from_millis(1000);

// ============================================================================
// BridgeConfig
// ============================================================================

/// Settings shared by the read and write bridges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL of the remote endpoint.
    pub endpoint: Url,

    /// How long the read bridge waits for its callback.
    pub read_timeout: Duration,

    /// How long the write bridge waits after the frame loads.
    pub write_settle: Duration,
}

impl BridgeConfig {
    /// Creates a config for `endpoint` with default timings.
    #[inline]
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_settle: DEFAULT_WRITE_SETTLE,
        }
    }

    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    /// Loads a config from JSON text.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is malformed or has unknown fields
    /// - [`Error::Config`] if validation fails
    pub fn from_json(text: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text)?;

        let mut builder = Self::builder().endpoint(file.endpoint);
        if let Some(ms) = file.read_timeout_ms {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.write_settle_ms {
            builder = builder.write_settle(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Returns the read timeout in whole milliseconds.
    #[inline]
    #[must_use]
    pub fn read_timeout_ms(&self) -> u64 {
        u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// On-disk shape of [`BridgeConfig`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    endpoint: String,
    read_timeout_ms: Option<u64>,
    write_settle_ms: Option<u64>,
}

// ============================================================================
// BridgeConfigBuilder
// ============================================================================

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct BridgeConfigBuilder {
    endpoint: Option<String>,
    read_timeout: Duration,
    write_settle: Duration,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_settle: DEFAULT_WRITE_SETTLE,
        }
    }
}

impl BridgeConfigBuilder {
    /// Creates a builder with default timings and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the read timeout.
    #[inline]
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write settle delay.
    #[inline]
    #[must_use]
    pub fn write_settle(mut self, delay: Duration) -> Self {
        self.write_settle = delay;
        self
    }

    /// Builds the config with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or not http(s)
    /// - [`Error::Config`] if the endpoint already carries `callback`
    /// - [`Error::Config`] if the read timeout is zero
    /// - [`Error::Url`] if the endpoint does not parse
    pub fn build(self) -> Result<BridgeConfig> {
        let endpoint = self.validate_endpoint()?;

        if self.read_timeout.is_zero() {
            return Err(Error::config("read timeout must be greater than zero"));
        }

        Ok(BridgeConfig {
            endpoint,
            read_timeout: self.read_timeout,
            write_settle: self.write_settle,
        })
    }

    fn validate_endpoint(&self) -> Result<Url> {
        let raw = self.endpoint.as_deref().ok_or_else(|| {
            Error::config(
                "Endpoint URL is required. Use .endpoint() to set it.\n\
                 Example: BridgeConfig::builder().endpoint(\"https://example.com/exec\")",
            )
        })?;

        let url = Url::parse(raw)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Endpoint must be http or https, got: {}",
                url.scheme()
            )));
        }

        if url.query_pairs().any(|(k, _)| k == CALLBACK_KEY) {
            return Err(Error::config(format!(
                "Endpoint must not carry a '{CALLBACK_KEY}' parameter"
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://script.example.com/macros/s/abc/exec";

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::builder().endpoint(ENDPOINT).build().expect("valid");
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.write_settle, Duration::from_millis(1000));
        assert_eq!(config.read_timeout_ms(), 30_000);
        assert_eq!(config, BridgeConfig::new(Url::parse(ENDPOINT).expect("url")));
    }

    #[test]
    fn test_build_fails_without_endpoint() {
        let err = BridgeConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("Endpoint URL is required"));
    }

    #[test]
    fn test_build_fails_with_bad_scheme() {
        let err = BridgeConfig::builder()
            .endpoint("ftp://example.com/exec")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_fails_with_unparsable_url() {
        let err = BridgeConfig::builder().endpoint("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_build_fails_with_reserved_callback() {
        let err = BridgeConfig::builder()
            .endpoint("https://example.com/exec?callback=x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("callback"));
    }

    #[test]
    fn test_build_fails_with_zero_timeout() {
        let result = BridgeConfig::builder()
            .endpoint(ENDPOINT)
            .read_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_settle_is_allowed() {
        let config = BridgeConfig::builder()
            .endpoint(ENDPOINT)
            .write_settle(Duration::ZERO)
            .build()
            .expect("valid");
        assert!(config.write_settle.is_zero());
    }

    #[test]
    fn test_from_json() {
        let json = format!(
            r#"{{"endpoint": "{ENDPOINT}", "readTimeoutMs": 5000, "writeSettleMs": 250}}"#
        );
        let config = BridgeConfig::from_json(&json).expect("valid");
        assert_eq!(config.read_timeout, Duration::from_millis(5000));
        assert_eq!(config.write_settle, Duration::from_millis(250));
    }

    #[test]
    fn test_from_json_defaults_missing_timings() {
        let json = format!(r#"{{"endpoint": "{ENDPOINT}"}}"#);
        let config = BridgeConfig::from_json(&json).expect("valid");
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let json = format!(r#"{{"endpoint": "{ENDPOINT}", "retries": 3}}"#);
        assert!(matches!(BridgeConfig::from_json(&json), Err(Error::Json(_))));
    }
}
