//! Cross-origin request bridge.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReadBridge`] | JSONP-style reads with timeout and callback registry |
//! | [`WriteBridge`] | Hidden-form writes with optimistic acknowledgment |
//! | [`BridgeConfig`] | Endpoint and timing configuration |
//! | [`RequestState`] | `Idle → Pending → {Resolved, Rejected}` |
//!
//! Both bridges guarantee that every exit path (success, failure, timeout,
//! or an abandoned future) releases its transport elements exactly once.

// ============================================================================
// Submodules
// ============================================================================

/// Bridge configuration and builder.
pub mod config;

/// Read bridge.
pub mod read;

/// Callback registry for pending reads.
pub(crate) mod registry;

/// Request lifecycle states.
pub mod state;

/// Write bridge.
pub mod write;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{BridgeConfig, BridgeConfigBuilder, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_SETTLE};
pub use read::{CALLBACK_KEY, ReadBridge};
pub use registry::CallbackSink;
pub use state::RequestState;
pub use write::{Unconfirmed, WriteBridge};
