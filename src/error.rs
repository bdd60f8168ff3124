//! Error types for the check-in bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use checkin_bridge::{Error, Result};
//!
//! async fn example(client: &CheckinClient) -> Result<()> {
//!     match client.get_stats().await {
//!         Ok(stats) => println!("{} check-ins", stats.total),
//!         Err(e) if e.is_timeout() => eprintln!("endpoint did not answer"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Bridge | [`Error::ReadTimeout`], [`Error::TransportLoad`], [`Error::Processing`] |
//! | Remote | [`Error::Remote`] |
//! | External | [`Error::Http`], [`Error::Json`], [`Error::Url`], [`Error::Io`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::{CallbackName, ElementId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument supplied to a bridge call.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Bridge Errors
    // ========================================================================
    /// The remote side never invoked the read callback in time.
    #[error("Request {callback} timed out after {timeout_ms}ms")]
    ReadTimeout {
        /// Callback name of the request that timed out.
        callback: CallbackName,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The transport element could not be loaded at all.
    ///
    /// Distinct from [`Error::ReadTimeout`]: the environment reported a
    /// failure instead of staying silent.
    #[error("Transport load failed for {element}: {message}")]
    TransportLoad {
        /// Element that failed to load.
        element: ElementId,
        /// Description of the load failure.
        message: String,
    },

    /// Cleanup-phase failure, surfaced after best-effort cleanup.
    #[error("Processing error: {message}")]
    Processing {
        /// Description of the processing failure.
        message: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The endpoint answered with `success: false`.
    #[error("Remote error: {message}")]
    Remote {
        /// Error message reported by the endpoint.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a read timeout error.
    #[inline]
    pub fn read_timeout(callback: CallbackName, timeout_ms: u64) -> Self {
        Self::ReadTimeout {
            callback,
            timeout_ms,
        }
    }

    /// Creates a transport load error.
    #[inline]
    pub fn transport_load(element: ElementId, message: impl Into<String>) -> Self {
        Self::TransportLoad {
            element,
            message: message.into(),
        }
    }

    /// Creates a processing error.
    #[inline]
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. })
    }

    /// Returns `true` if the transport itself failed.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::TransportLoad { .. } | Self::Http(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed if the caller issues the call again.
    /// The bridge itself never retries.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ReadTimeout { .. } | Self::TransportLoad { .. } | Self::Http(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
