//! Error types for the StreamSave engine

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the download engine.
///
/// Worker-side failures never cross the façade boundary as `Err` values;
/// they end up as a `Failed` record plus a failure event carrying
/// `EngineError::to_string()` as the human-readable reason.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download not found: {0}")]
    NotFound(Uuid),

    #[error("download URL cannot be empty")]
    EmptyUrl,

    #[error("server returned HTTP {status}")]
    Server { status: u16 },

    #[error("download was cancelled")]
    Cancelled,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
