//! Error types. Nothing here is fatal to a node: callers log and carry on.

use rust_decimal::Decimal;
use std::time::Duration;

/// Rejected order input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("order amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("order price must be positive, got {0}")]
    NonPositivePrice(Decimal),
}

/// Failure of a peer transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerError {
    /// The request did not complete within its budget.
    #[error("request to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },
    /// Connection refused, HTTP failure, undecodable reply.
    #[error("transport error talking to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },
    /// The rendezvous has no endpoint for this service name.
    #[error("service {0} could not be resolved")]
    Unresolved(String),
    /// Unrecognized `action` or a payload that does not decode.
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl PeerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PeerError::Timeout { .. })
    }
}

/// Invalid configuration value read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Unparseable CLI input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Please provide amount and price")]
    MissingArguments,
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("Unknown command. Try again.")]
    Unknown(String),
    #[error(transparent)]
    Order(#[from] BookError),
}
