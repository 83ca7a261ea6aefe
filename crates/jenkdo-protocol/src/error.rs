//! Error types for response decoding.

/// Errors raised while decoding a server response.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("missing response header '{0}'")]
    MissingHeader(&'static str),

    #[error("invalid value '{value}' for header '{name}'")]
    InvalidHeader { name: &'static str, value: String },

    #[error("log cursor would move from {start} to {next}")]
    CursorRegression { start: u64, next: u64 },

    #[error("queue location '{0}' does not end in a numeric item id")]
    InvalidQueueLocation(String),
}
