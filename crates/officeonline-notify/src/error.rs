use thiserror::Error;

/// Failure reported by a transport through a subscribe, unsubscribe or
/// publish acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unknown subscription handle: {0}")]
    UnknownHandle(String),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame message {message_id} is missing {field}")]
    MissingValue {
        message_id: String,
        field: &'static str,
    },
}
