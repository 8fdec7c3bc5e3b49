use crate::clock::Clock;
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{
    hours_between, Project, ProjectCatalog, SyncState, TimeLog, TimeLogDraft, TimeLogPatch,
    TimeLogStatus, TrackerSettings, UserContext,
};
use crate::store::{RecordStore, StoreError, StoreResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Duration;
use uuid::Uuid;

// Every remote store access in the crate goes through this adapter. Writes are
// two-phase: the in-memory collection is mutated first so the UI always sees
// the user's intent, then the remote write is attempted and the outcome is
// recorded on the record's sync state.
pub struct TimeLogRepository {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    catalog: Arc<RwLock<ProjectCatalog>>,
    settings: TrackerSettings,
    logs: Mutex<Vec<TimeLog>>,
    degraded: AtomicBool,
}

impl TimeLogRepository {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        catalog: Arc<RwLock<ProjectCatalog>>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            store,
            clock,
            catalog,
            settings,
            logs: Mutex::new(Vec::new()),
            degraded: AtomicBool::new(false),
        }
    }

    /// Replaces the working collection with the user's records from the store.
    /// On final failure the collection is cleared and the degraded flag is set;
    /// calling `load` again is the retry path.
    pub async fn load(&self, ctx: &UserContext) -> TrackerResult<Vec<TimeLog>> {
        match self
            .with_retry(|| self.store.list_time_logs(&ctx.user_id))
            .await
        {
            Ok(fetched) => {
                let fetched: Vec<TimeLog> =
                    fetched.into_iter().map(TimeLog::sanitize).collect();
                *self.logs.lock().await = fetched.clone();
                self.degraded.store(false, Ordering::Relaxed);
                Ok(fetched)
            }
            Err(error) => {
                tracing::warn!(user_id = %ctx.user_id, error = %error, "time log load failed");
                self.logs.lock().await.clear();
                self.degraded.store(true, Ordering::Relaxed);
                Err(TrackerError::LoadFailure(format!(
                    "could not load time logs: {error}"
                )))
            }
        }
    }

    /// Refreshes the shared project catalog from the store.
    pub async fn load_projects(&self) -> TrackerResult<Vec<Project>> {
        let projects = self.with_retry(|| self.store.list_projects()).await?;
        self.catalog.write().await.replace(projects.clone());
        Ok(projects)
    }

    /// Validates the draft and persists a new record. When the store is
    /// unreachable the record keeps a synthesized `local-` id and stays
    /// client-side; only validation errors fail the call.
    pub async fn create(
        &self,
        ctx: &UserContext,
        draft: &TimeLogDraft,
    ) -> TrackerResult<TimeLog> {
        let record = self.materialize(ctx, draft).await?;
        let attempt = self.with_retry(|| self.store.create_time_log(&record)).await;
        let stored = match attempt {
            Ok(stored) => stored.sanitize(),
            Err(error) => {
                tracing::warn!(
                    user_id = %ctx.user_id,
                    task = %record.task_name,
                    error = %error,
                    "remote create failed; keeping record local-only"
                );
                let mut local = record;
                local.id = format!("local-{}", Uuid::new_v4());
                local.sync = SyncState::LocalOnly;
                local
            }
        };
        self.logs.lock().await.push(stored.clone());
        Ok(stored)
    }

    /// Merges the patch into the record. Local state is patched first; the
    /// returned bool reports whether the store accepted the write.
    pub async fn update(
        &self,
        ctx: &UserContext,
        id: &str,
        patch: &TimeLogPatch,
    ) -> TrackerResult<bool> {
        let mut logs = self.logs.lock().await;
        let Some(index) = logs.iter().position(|log| log.id == id) else {
            return Err(TrackerError::NotFound(format!("no time log {id}")));
        };
        patch.apply_to(&mut logs[index]);
        logs[index] = logs[index].clone().sanitize();

        if logs[index].sync == SyncState::LocalOnly {
            // never reached the store; there is nothing remote to patch
            return Ok(false);
        }

        match self.with_retry(|| self.store.update_time_log(id, patch)).await {
            Ok(accepted) => {
                logs[index].sync = if accepted {
                    SyncState::Synced
                } else {
                    SyncState::Dirty
                };
                if !accepted {
                    tracing::warn!(user_id = %ctx.user_id, id, "store had no row for updated time log");
                }
                Ok(accepted)
            }
            Err(error) => {
                logs[index].sync = SyncState::Dirty;
                tracing::warn!(
                    user_id = %ctx.user_id,
                    id,
                    error = %error,
                    "time log update kept local only"
                );
                Ok(false)
            }
        }
    }

    /// Removes the record from the collection regardless of the remote
    /// outcome; the UI has no safe way to block a delete on a sync failure.
    pub async fn delete(&self, ctx: &UserContext, id: &str) -> TrackerResult<bool> {
        let mut logs = self.logs.lock().await;
        let Some(index) = logs.iter().position(|log| log.id == id) else {
            return Err(TrackerError::NotFound(format!("no time log {id}")));
        };
        let removed = logs.remove(index);
        if removed.sync == SyncState::LocalOnly {
            // never reached the store, so removing it locally is the whole job
            return Ok(true);
        }

        match self.with_retry(|| self.store.delete_time_log(id)).await {
            Ok(accepted) => {
                if !accepted {
                    tracing::warn!(user_id = %ctx.user_id, id, "store had no row for deleted time log");
                }
                Ok(accepted)
            }
            Err(error) => {
                tracing::warn!(
                    user_id = %ctx.user_id,
                    id,
                    error = %error,
                    "record removed locally; store delete failed"
                );
                Ok(false)
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<TimeLog> {
        self.logs.lock().await.clone()
    }

    pub async fn find(&self, id: &str) -> Option<TimeLog> {
        self.logs
            .lock()
            .await
            .iter()
            .find(|log| log.id == id)
            .cloned()
    }

    pub async fn unsynced_count(&self) -> usize {
        self.logs
            .lock()
            .await
            .iter()
            .filter(|log| log.sync != SyncState::Synced)
            .count()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn clear_degraded(&self) {
        self.degraded.store(false, Ordering::Relaxed);
    }

    async fn materialize(
        &self,
        ctx: &UserContext,
        draft: &TimeLogDraft,
    ) -> TrackerResult<TimeLog> {
        let catalog = self.catalog.read().await;
        if !catalog.contains(&draft.project_id) {
            return Err(TrackerError::InvalidProject(format!(
                "unknown project {}",
                draft.project_id
            )));
        }
        let start_time = draft.start_time.unwrap_or_else(|| self.clock.now());
        if let Some(end_time) = draft.end_time {
            if end_time < start_time {
                return Err(TrackerError::InvalidInterval(format!(
                    "end {end_time} is before start {start_time}"
                )));
            }
        }
        let duration_hours = draft.duration_hours.unwrap_or_else(|| {
            draft
                .end_time
                .map(|end_time| hours_between(start_time, end_time))
                .unwrap_or(0.0)
        });
        let project_name = draft
            .project_name
            .clone()
            .or_else(|| catalog.title(&draft.project_id).map(str::to_string))
            .unwrap_or_default();

        Ok(TimeLog {
            id: String::new(),
            project_id: draft.project_id.clone(),
            project_name,
            task_name: draft.task_name.clone(),
            description: draft.description.clone(),
            user_id: ctx.user_id.clone(),
            start_time,
            end_time: draft.end_time,
            duration_hours,
            status: draft.status.unwrap_or(TimeLogStatus::Completed),
            tags: draft.tags.clone(),
            sync: SyncState::Synced,
        }
        .sanitize())
    }

    // Bounded retry for remote calls. Only unreachable-store failures are
    // retried; a rejected payload will not get better on a second attempt.
    async fn with_retry<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let attempts = 1 + self.settings.store_retry_attempts;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Unavailable(message)) => {
                    if attempt < attempts {
                        tracing::debug!(attempt, "store unavailable, retrying");
                        tokio::time::sleep(Duration::from_millis(self.settings.retry_backoff_ms))
                            .await;
                    }
                    last_error = Some(StoreError::Unavailable(message));
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error
            .unwrap_or_else(|| StoreError::Unavailable("store unreachable".to_string())))
    }
}
