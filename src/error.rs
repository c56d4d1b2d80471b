use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser automation backend.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("webdriver returned '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected webdriver response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DriverError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        DriverError::Timeout {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors raised while discovering, resolving or publishing a job.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("authentication failed: {0}")]
    Authentication(DriverError),

    #[error("navigation to the publish surface failed: {0}")]
    Navigation(DriverError),

    #[error("could not open the file selection surface (batch {batch})")]
    FileSelectionUnavailable { batch: usize },

    #[error("required field '{0}' is not present on the publish form")]
    MissingRequiredField(&'static str),

    #[error("no destination matches '{0}'")]
    DestinationUnresolved(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;
