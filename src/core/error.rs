use thiserror::Error;

use crate::core::types::OperationKind;

#[derive(Error, Debug)]
pub enum SpansimError {
    #[error("unsupported operation kind: {0}")]
    UnsupportedOperationKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid operation record: {0}")]
    InvalidRecord(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("GRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Channel send error")]
    ChannelSend,

    #[error("Failure probability must be between 0.0 and 1.0, got {0}")]
    InvalidFailureProbability(f64),
}

/// Result type alias for spansim operations
pub type Result<T> = std::result::Result<T, SpansimError>;

impl SpansimError {
    /// Creates an unsupported-kind error from anything kind-like
    pub fn unsupported<S: Into<String>>(kind: S) -> Self {
        Self::UnsupportedOperationKind(kind.into())
    }

    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new invalid-record error
    pub fn invalid_record<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Creates a new sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Self::Sink(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Sink(_) => true,
            Self::ChannelSend => true,
            Self::Transport(_) => true,
            Self::Grpc(status) => {
                matches!(status.code(), tonic::Code::Unavailable | tonic::Code::DeadlineExceeded)
            },
            _ => false,
        }
    }

    /// Returns true when the caller asked for something we cannot simulate,
    /// as opposed to an internal failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedOperationKind(_))
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedOperationKind(_) => "validation",
            Self::Config(_) | Self::InvalidFailureProbability(_) => "config",
            Self::InvalidRecord(_) => "record",
            Self::Sink(_) => "sink",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Grpc(_) | Self::Transport(_) | Self::Network(_) => "network",
            Self::Join(_) => "async",
            Self::ChannelSend => "channel",
        }
    }
}

impl From<OperationKind> for SpansimError {
    fn from(kind: OperationKind) -> Self {
        Self::UnsupportedOperationKind(kind.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SpansimError::unsupported("warp_drive");
        assert_eq!(err.to_string(), "unsupported operation kind: warp_drive");
        assert_eq!(err.category(), "validation");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_error_recoverability() {
        assert!(SpansimError::network("collector unreachable").is_recoverable());
        assert!(SpansimError::sink("export backlog").is_recoverable());
        assert!(!SpansimError::config("bad yaml").is_recoverable());
        assert!(!SpansimError::unsupported("nope").is_recoverable());
    }

    #[test]
    fn test_probability_error_display() {
        let err = SpansimError::InvalidFailureProbability(1.5);
        assert_eq!(err.to_string(), "Failure probability must be between 0.0 and 1.0, got 1.5");
        assert_eq!(err.category(), "config");
    }
}
