//! Error types for the sync engine.
//!
//! Every error here is contained within the sync loop: a failed push leaves
//! the object dirty for the next cycle, a failed query skips that cycle's
//! pull. Nothing propagates to the controller's write path.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while talking to the remote record ledger.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The ledger answered with a non-success HTTP status.
    #[error("remote store returned status {status}: {body}")]
    RemoteStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// A response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ledgersync_protocol::ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::RemoteStatus {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "remote store returned status 503: unavailable"
        );

        let err = EngineError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
