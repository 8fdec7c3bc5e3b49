use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("INVALID_PROJECT: {0}")]
    InvalidProject(String),
    #[error("TIMER_ALREADY_RUNNING: {0}")]
    TimerAlreadyRunning(String),
    #[error("TIMER_NOT_RUNNING: {0}")]
    TimerNotRunning(String),
    #[error("INVALID_INTERVAL: {0}")]
    InvalidInterval(String),
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),
    #[error("LOAD_FAILURE: {0}")]
    LoadFailure(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
            StoreError::Rejected(message) => Self::Internal(message),
            StoreError::Backend(error) => Self::Internal(error.to_string()),
        }
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
