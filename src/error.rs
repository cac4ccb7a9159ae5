use thiserror::Error;

/// Failure reported by a settings backend write
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Write rejected for '{0}'")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] BackendError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
