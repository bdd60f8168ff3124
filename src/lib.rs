//! Check-in Bridge - Cross-origin request bridge for a check-in endpoint.
//!
//! This library talks to a remote check-in endpoint that cannot be reached
//! with ordinary cross-origin requests.
//!
//! # Architecture
//!
//! Two asymmetric channels share one endpoint:
//!
//! - **Read Bridge**: JSONP-style script loads. The endpoint wraps its JSON
//!   response in a call to a uniquely named callback. Reads are verifiable
//!   and bounded by a timeout (30 s by default).
//! - **Write Bridge**: A hidden POST form targeting a hidden frame. The
//!   response is cross-origin and unreadable, so writes resolve
//!   optimistically a fixed delay (1 s by default) after the frame loads.
//!
//! Key design principles:
//!
//! - Each in-flight read owns one callback name and one script element
//! - Every exit path releases its elements exactly once, even when the
//!   caller drops the future
//! - Transports sit behind the [`ScriptChannel`] and [`FrameChannel`] traits
//!
//! # Quick Start
//!
//! ```no_run
//! use checkin_bridge::{BridgeConfig, CheckIn, CheckinClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BridgeConfig::builder()
//!         .endpoint("https://script.example.com/macros/s/abc/exec")
//!         .build()?;
//!
//!     let client = CheckinClient::http(config)?;
//!
//!     // Verified read
//!     let stats = client.get_stats().await?;
//!     println!("{} check-ins this week", stats.this_week);
//!
//!     // Optimistic write
//!     let ack = client.submit_check_in(&CheckIn::named("Kim")).await?;
//!     println!("{}", ack.message);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`ReadBridge`], [`WriteBridge`] and their configuration |
//! | [`client`] | Typed check-in operations: [`CheckinClient`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Callback, frame and element names |
//! | [`protocol`] | Actions, request parameters and response envelopes |
//! | [`transport`] | Channel traits, HTTP and in-memory channels, JSONP parsing |

// ============================================================================
// Modules
// ============================================================================

/// Read and write bridges.
///
/// The bridges own the request lifecycle: naming, registration, timeout
/// and cleanup.
pub mod bridge;

/// Typed check-in client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Identifiers for callbacks, frames and attached elements.
pub mod identifiers;

/// Request and response types.
pub mod protocol;

/// Channels that carry bridge requests.
///
/// [`HttpScriptChannel`] and [`HttpFrameChannel`] emulate a browser
/// document over HTTP; [`MemoryDocument`] is a scripted stand-in for tests.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{BridgeConfig, BridgeConfigBuilder, ReadBridge, RequestState, Unconfirmed, WriteBridge};

// Client types
pub use client::{CheckIn, CheckinClient, ExportBundle, Record, Stats};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallbackName, ElementId, FrameName};

// Protocol types
pub use protocol::{Action, RequestParameters, ResponsePayload};

// Transport types
pub use transport::{
    FrameChannel, HttpFrameChannel, HttpScriptChannel, MemoryDocument, ScriptChannel,
};
