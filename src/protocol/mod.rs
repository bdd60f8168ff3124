//! Wire-level types exchanged with the endpoint.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Carried as |
//! |---------|-----------|------------|
//! | [`RequestParameters`] | Local → Remote | Query string (read) or form fields (write) |
//! | [`ResponsePayload`] | Remote → Local | Argument of the JSONP callback |
//!
//! Every request carries an `action` parameter naming one [`Action`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Operation names |
//! | `params` | Ordered request parameters |
//! | `response` | Opaque payload and typed envelope |

// ============================================================================
// Submodules
// ============================================================================

/// Operation names.
pub mod action;

/// Ordered request parameters.
pub mod params;

/// Response payload and envelope types.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::Action;
pub use params::{ACTION_KEY, RequestParameters};
pub use response::{Envelope, ResponsePayload};
