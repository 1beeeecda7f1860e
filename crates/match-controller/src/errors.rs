//! Match Controller error types.
//!
//! Almost every precondition failure in this service is a silent drop by
//! design (stale invites, moves out of turn, events for dead sessions), so
//! the error surface is small: it covers actor plumbing failures and the
//! conditions under which the controller refuses new work. Nothing here is
//! ever forwarded to a client.

use thiserror::Error;

/// Match Controller error type.
#[derive(Debug, Error)]
pub enum McError {
    /// Actor mailbox or response channel failure (actor gone or draining).
    #[error("Internal error: {0}")]
    Internal(String),

    /// The controller is shutting down and refuses new sessions.
    #[error("Controller is draining")]
    Draining,

    /// The configured session limit was reached.
    #[error("Session capacity exceeded")]
    CapacityExceeded,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", McError::Internal("channel closed".to_string())),
            "Internal error: channel closed"
        );
        assert_eq!(format!("{}", McError::Draining), "Controller is draining");
        assert_eq!(
            format!("{}", McError::CapacityExceeded),
            "Session capacity exceeded"
        );
    }
}
