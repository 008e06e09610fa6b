//! Core error types.

use thiserror::Error;

/// Errors raised while interpreting data received from the server.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An inbound frame was not a JSON object with a string `type`.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_frame_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CoreError::from(json_err);
        assert!(err.to_string().starts_with("malformed frame:"));
    }
}
