//! Error taxonomy
//!
//! Layered error enums: `BrokerError` for the RPC boundary, `EngineError`
//! for everything the engine surfaces. The taxonomy distinguishes the
//! conditions with different propagation rules:
//!
//! - `Connection`: retry-safe, the owning loop continues next tick.
//! - `AuthExpired`: never retried locally; cascades into a one-time session
//!   teardown.
//! - `Rejected`: terminal for the signal that caused it, surfaced once.
//! - `NotFound`: idempotent success for close paths, not an error there.
//! - `Validation`: rejected before any broker call.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::persistence::DatabaseError;

/// Errors surfaced by the broker session boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker session expired")]
    AuthExpired,

    #[error("order rejected (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("position not found")]
    NotFound,

    #[error("invalid broker response: {0}")]
    InvalidResponse(String),

    #[error("no live broker session")]
    NotConnected,
}

/// Errors surfaced by the signal execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("robot not found: {0}")]
    RobotNotFound(String),

    #[error("engine unavailable: {0}")]
    ChannelClosed(String),
}

impl EngineError {
    /// The one condition allowed to cascade into full session teardown.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, EngineError::Broker(BrokerError::AuthExpired))
    }
}

impl<T> From<mpsc::error::SendError<T>> for EngineError {
    fn from(e: mpsc::error::SendError<T>) -> Self {
        EngineError::ChannelClosed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_expired_detection() {
        assert!(EngineError::from(BrokerError::AuthExpired).is_auth_expired());
        assert!(!EngineError::from(BrokerError::NotFound).is_auth_expired());
        assert!(!EngineError::Validation("zero volume".into()).is_auth_expired());
    }

    #[test]
    fn test_rejected_display_carries_code() {
        let err = BrokerError::Rejected { code: 134, message: "not enough money".into() };
        assert!(err.to_string().contains("134"));
    }
}
