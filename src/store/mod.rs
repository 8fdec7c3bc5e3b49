pub mod memory;
pub mod sqlite;

use crate::models::{Project, TimeLog, TimeLogPatch};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("UNAVAILABLE: {0}")]
    Unavailable(String),
    #[error("REJECTED: {0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(anyhow::Error::new(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Backend(anyhow::Error::new(value))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// Record CRUD the tracker consumes. Implementations adapt whatever transport
// and field shapes the backing store speaks to the canonical records; ids for
// new records are assigned by the store when the draft id is empty.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_time_logs(&self, user_id: &str) -> StoreResult<Vec<TimeLog>>;

    async fn create_time_log(&self, log: &TimeLog) -> StoreResult<TimeLog>;

    async fn update_time_log(&self, id: &str, patch: &TimeLogPatch) -> StoreResult<bool>;

    async fn delete_time_log(&self, id: &str) -> StoreResult<bool>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
}
