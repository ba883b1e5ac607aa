//! Shared error type across qat-rpc crates.

use thiserror::Error;

/// Stable error kinds surfaced to clients in `Exception` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed message shape, bad config or bad port settings.
    Validation,
    /// A send exceeded its retry window.
    Timeout,
    /// Operation intentionally unavailable.
    NotImplemented,
    /// Failure inside the execution engine.
    EngineExecution,
    /// Fatal startup misconfiguration.
    Configuration,
    /// Socket-level failure other than "not ready".
    Transport,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// String representation used in `Exception` replies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::NotImplemented => "NotImplementedError",
            ErrorKind::EngineExecution => "EngineExecutionError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RpcError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("sending {message} on {address} timed out")]
    Timeout { message: String, address: String },
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("engine execution failed: {0}")]
    Engine(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RpcError {
    /// Map the error to its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Validation(_) => ErrorKind::Validation,
            RpcError::Timeout { .. } => ErrorKind::Timeout,
            RpcError::NotImplemented(_) => ErrorKind::NotImplemented,
            RpcError::Engine(_) => ErrorKind::EngineExecution,
            RpcError::Configuration(_) => ErrorKind::Configuration,
            RpcError::Transport(_) => ErrorKind::Transport,
            RpcError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Text placed under the `Exception` key of a failure reply,
    /// e.g. `NotImplementedError('qubit info')`.
    pub fn repr(&self) -> String {
        let detail = match self {
            RpcError::Validation(m)
            | RpcError::NotImplemented(m)
            | RpcError::Engine(m)
            | RpcError::Configuration(m)
            | RpcError::Transport(m)
            | RpcError::Internal(m) => m.clone(),
            RpcError::Timeout { .. } => self.to_string(),
        };
        format!("{}('{}')", self.kind().as_str(), detail.replace('\'', "\\'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_uses_kind_and_detail() {
        let err = RpcError::NotImplemented("qubit info".into());
        assert_eq!(err.repr(), "NotImplementedError('qubit info')");
    }

    #[test]
    fn timeout_names_message_and_address() {
        let err = RpcError::Timeout {
            message: "[\"version\"]".into(),
            address: "tcp://127.0.0.1:5556".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("tcp://127.0.0.1:5556"));
        assert!(err.repr().starts_with("TimeoutError('sending"));
    }

    #[test]
    fn repr_escapes_quotes() {
        let err = RpcError::Validation("it's bad".into());
        assert_eq!(err.repr(), "ValidationError('it\\'s bad')");
    }
}
