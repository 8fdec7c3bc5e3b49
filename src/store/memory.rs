use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Project, SyncState, TimeLog, TimeLogPatch};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

// In-memory store for tests and local development. set_online(false) makes
// every call fail the way an unreachable backend does.
pub struct MemoryStore {
    time_logs: Mutex<Vec<TimeLog>>,
    projects: Mutex<Vec<Project>>,
    online: AtomicBool,
    calls: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            time_logs: Mutex::new(Vec::new()),
            projects: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(projects: Vec<Project>) -> Self {
        Self {
            projects: Mutex::new(projects),
            ..Self::default()
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub async fn seed_time_logs(&self, logs: Vec<TimeLog>) {
        *self.time_logs.lock().await = logs;
    }

    pub async fn stored_time_logs(&self) -> Vec<TimeLog> {
        self.time_logs.lock().await.clone()
    }

    fn guard(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.online.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_time_logs(&self, user_id: &str) -> StoreResult<Vec<TimeLog>> {
        self.guard()?;
        let logs = self.time_logs.lock().await;
        Ok(logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .map(TimeLog::sanitize)
            .collect())
    }

    async fn create_time_log(&self, log: &TimeLog) -> StoreResult<TimeLog> {
        self.guard()?;
        let mut stored = log.clone().sanitize();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        stored.sync = SyncState::Synced;
        self.time_logs.lock().await.push(stored.clone());
        Ok(stored)
    }

    async fn update_time_log(&self, id: &str, patch: &TimeLogPatch) -> StoreResult<bool> {
        self.guard()?;
        let mut logs = self.time_logs.lock().await;
        match logs.iter_mut().find(|log| log.id == id) {
            Some(log) => {
                patch.apply_to(log);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_time_log(&self, id: &str) -> StoreResult<bool> {
        self.guard()?;
        let mut logs = self.time_logs.lock().await;
        let before = logs.len();
        logs.retain(|log| log.id != id);
        Ok(logs.len() < before)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.guard()?;
        Ok(self.projects.lock().await.clone())
    }
}
