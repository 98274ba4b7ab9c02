//! Error types for the thermowatch service

/// Errors that can occur in the thermowatch service
#[derive(Debug, thiserror::Error)]
pub enum ThermowatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sensor fetch failed: {0}")]
    Fetch(String),

    #[error("Sensor data parse error: {0}")]
    Parse(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Archive unavailable: {0}")]
    ArchiveUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for thermowatch operations
pub type Result<T> = std::result::Result<T, ThermowatchError>;
