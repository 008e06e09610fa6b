//! Client error types.

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the client API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The notification URL could not be derived from configuration.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// An outbound frame was requested while the channel is not open.
    #[error("not connected")]
    NotConnected,
    /// The channel settled in `Closed` without opening.
    #[error("connection closed")]
    Closed,
    /// The operation did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The client task has shut down.
    #[error("client shut down")]
    ShutDown,
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
