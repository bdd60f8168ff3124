//! Request lifecycle shared by both bridges.
//!
//! ```text
//! Idle ──issue──► Pending ──► Resolved
//!   │                │
//!   └────────────────┴──────► Rejected
//! ```
//!
//! `Idle → Rejected` covers a transport that refuses the element before the
//! request is ever in flight. Terminal states never transition again.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// RequestState
// ============================================================================

/// Lifecycle state of one bridge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    /// Created, transport not yet issued.
    #[default]
    Idle,
    /// Transport issued, waiting for completion.
    Pending,
    /// Completed successfully.
    Resolved,
    /// Completed with an error.
    Rejected,
}

impl RequestState {
    /// Returns `true` for `Resolved` and `Rejected`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for any transition not in the diagram.
    pub fn advance(self, next: Self) -> Result<Self> {
        match (self, next) {
            (Self::Idle, Self::Pending)
            | (Self::Idle, Self::Rejected)
            | (Self::Pending, Self::Resolved)
            | (Self::Pending, Self::Rejected) => Ok(next),
            _ => Err(Error::processing(format!(
                "illegal request transition {self} -> {next}"
            ))),
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_paths() {
        let pending = RequestState::Idle.advance(RequestState::Pending).expect("issue");
        assert_eq!(pending.advance(RequestState::Resolved).ok(), Some(RequestState::Resolved));
        assert_eq!(pending.advance(RequestState::Rejected).ok(), Some(RequestState::Rejected));
    }

    #[test]
    fn test_rejected_before_issue() {
        assert!(RequestState::Idle.advance(RequestState::Rejected).is_ok());
        assert!(RequestState::Idle.advance(RequestState::Resolved).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [RequestState::Resolved, RequestState::Rejected] {
            assert!(terminal.is_terminal());
            assert!(terminal.advance(RequestState::Pending).is_err());
            assert!(terminal.advance(RequestState::Resolved).is_err());
            assert!(terminal.advance(RequestState::Rejected).is_err());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestState::Pending.to_string(), "pending");
    }
}
