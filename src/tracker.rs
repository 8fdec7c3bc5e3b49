use crate::clock::{Clock, SystemClock};
use crate::errors::TrackerResult;
use crate::filter;
use crate::metrics::TimeMetrics;
use crate::models::{
    Project, ProjectCatalog, SortKey, SortOrder, TimeLog, TimeLogDraft, TimeLogFilters,
    TimeLogPatch, TimeLogStatus, TrackerSettings, UserContext,
};
use crate::repository::TimeLogRepository;
use crate::store::RecordStore;
use crate::timer::{TimerEngine, TimerState};
use std::sync::Arc;
use std::sync::RwLock as StdRwLock;
use tokio::sync::{watch, RwLock};

/// Session-level entry point wiring the store, repository, project catalog
/// and timer together. Every mutation refreshes the cached metrics so the UI
/// reads a consistent snapshot without recomputing.
pub struct TrackerCore {
    repository: Arc<TimeLogRepository>,
    timer: TimerEngine,
    catalog: Arc<RwLock<ProjectCatalog>>,
    clock: Arc<dyn Clock>,
    settings: TrackerSettings,
    metrics: StdRwLock<TimeMetrics>,
}

impl TrackerCore {
    pub fn new(store: Arc<dyn RecordStore>, settings: TrackerSettings) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), settings)
    }

    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        let catalog = Arc::new(RwLock::new(ProjectCatalog::default()));
        let repository = Arc::new(TimeLogRepository::new(
            store,
            Arc::clone(&clock),
            Arc::clone(&catalog),
            settings.clone(),
        ));
        let timer = TimerEngine::new(Arc::clone(&repository), Arc::clone(&clock), settings.clone());
        Self {
            repository,
            timer,
            catalog,
            clock,
            settings,
            metrics: StdRwLock::new(TimeMetrics::default()),
        }
    }

    /// Loads the project catalog and the user's records, then adopts any
    /// running record a previous session left behind so it can still be
    /// stopped. A failed catalog refresh is non-fatal; a failed record load
    /// surfaces as `LoadFailure` with an empty working collection.
    pub async fn load_session(&self, ctx: &UserContext) -> TrackerResult<Vec<TimeLog>> {
        if let Err(error) = self.repository.load_projects().await {
            tracing::warn!(error = %error, "project catalog refresh failed; keeping previous entries");
        }
        match self.repository.load(ctx).await {
            Ok(logs) => {
                let running: Vec<TimeLog> = logs
                    .iter()
                    .filter(|log| log.status == TimeLogStatus::Running)
                    .cloned()
                    .collect();
                if !running.is_empty() {
                    self.timer.adopt(ctx, running).await;
                }
                self.refresh_metrics().await;
                Ok(self.repository.snapshot().await)
            }
            Err(error) => {
                self.refresh_metrics().await;
                Err(error)
            }
        }
    }

    pub async fn start_timer(
        &self,
        ctx: &UserContext,
        project_id: &str,
        task_name: &str,
    ) -> TrackerResult<TimeLog> {
        let record = self.timer.start(ctx, project_id, task_name).await?;
        self.refresh_metrics().await;
        Ok(record)
    }

    pub async fn stop_timer(&self, ctx: &UserContext) -> TrackerResult<TimeLog> {
        let record = self.timer.stop(ctx).await?;
        self.refresh_metrics().await;
        Ok(record)
    }

    pub async fn cancel_timer(&self, ctx: &UserContext) -> TrackerResult<TimeLog> {
        let record = self.timer.cancel(ctx).await?;
        self.refresh_metrics().await;
        Ok(record)
    }

    /// Manual entry; defaults to a completed record when the draft carries no
    /// explicit status.
    pub async fn log_manual_entry(
        &self,
        ctx: &UserContext,
        draft: &TimeLogDraft,
    ) -> TrackerResult<TimeLog> {
        let record = self.repository.create(ctx, draft).await?;
        self.refresh_metrics().await;
        Ok(record)
    }

    pub async fn update_entry(
        &self,
        ctx: &UserContext,
        id: &str,
        patch: &TimeLogPatch,
    ) -> TrackerResult<bool> {
        let accepted = self.repository.update(ctx, id, patch).await?;
        self.refresh_metrics().await;
        Ok(accepted)
    }

    pub async fn delete_entry(&self, ctx: &UserContext, id: &str) -> TrackerResult<bool> {
        let accepted = self.repository.delete(ctx, id).await?;
        self.refresh_metrics().await;
        Ok(accepted)
    }

    pub async fn entries(&self) -> Vec<TimeLog> {
        self.repository.snapshot().await
    }

    pub async fn filtered_entries(
        &self,
        filters: &TimeLogFilters,
        key: SortKey,
        order: SortOrder,
    ) -> Vec<TimeLog> {
        filter::apply(&self.repository.snapshot().await, filters, key, order)
    }

    pub fn metrics(&self) -> TimeMetrics {
        self.metrics.read().expect("metrics cache lock").clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.catalog.read().await.all().to_vec()
    }

    pub async fn timer_state(&self) -> TimerState {
        self.timer.state().await
    }

    pub async fn tick(&self) -> Option<f64> {
        self.timer.tick().await
    }

    pub fn elapsed_watch(&self) -> watch::Receiver<f64> {
        self.timer.elapsed_watch()
    }

    pub fn is_degraded(&self) -> bool {
        self.repository.is_degraded()
    }

    pub fn clear_degraded(&self) {
        self.repository.clear_degraded()
    }

    pub async fn unsynced_count(&self) -> usize {
        self.repository.unsynced_count().await
    }

    async fn refresh_metrics(&self) {
        let snapshot = self.repository.snapshot().await;
        let computed = TimeMetrics::compute(
            &snapshot,
            self.clock.now(),
            self.settings.weekly_target_hours,
        );
        *self.metrics.write().expect("metrics cache lock") = computed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::memory::MemoryStore;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    fn start_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn seeded_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_projects(vec![
            Project {
                id: "proj-1".to_string(),
                title: "Internal".to_string(),
            },
            Project {
                id: "proj-2".to_string(),
                title: "Client A".to_string(),
            },
        ]))
    }

    fn core(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> TrackerCore {
        let settings = TrackerSettings {
            store_retry_attempts: 0,
            retry_backoff_ms: 1,
            ..TrackerSettings::default()
        };
        TrackerCore::with_clock(store, clock, settings)
    }

    #[tokio::test]
    async fn load_session_fills_catalog_and_collection() {
        let store = seeded_store();
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(store, clock);
        let ctx = UserContext::new("user-1");

        let logs = tracker.load_session(&ctx).await.expect("load");
        assert!(logs.is_empty());
        assert_eq!(tracker.projects().await.len(), 2);
        assert!(!tracker.is_degraded());
    }

    #[tokio::test]
    async fn metrics_cache_follows_mutations() {
        let store = seeded_store();
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(store, Arc::clone(&clock));
        let ctx = UserContext::new("user-1");
        tracker.load_session(&ctx).await.expect("load");
        assert_eq!(tracker.metrics(), TimeMetrics::default());

        let draft = TimeLogDraft {
            project_id: "proj-1".to_string(),
            project_name: None,
            task_name: "Report".to_string(),
            description: String::new(),
            start_time: Some(clock.now()),
            end_time: None,
            duration_hours: Some(2.5),
            status: None,
            tags: Vec::new(),
        };
        let created = tracker.log_manual_entry(&ctx, &draft).await.expect("create");
        assert_eq!(tracker.metrics().completed_tasks, 1);
        assert_eq!(tracker.metrics().total_hours, 2.5);

        tracker.delete_entry(&ctx, &created.id).await.expect("delete");
        assert_eq!(tracker.metrics().completed_tasks, 0);
        assert_eq!(tracker.metrics().total_hours, 0.0);
    }

    #[tokio::test]
    async fn update_keeps_collection_and_metrics_aligned() {
        let store = seeded_store();
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(store, Arc::clone(&clock));
        let ctx = UserContext::new("user-1");
        tracker.load_session(&ctx).await.expect("load");

        let draft = TimeLogDraft {
            project_id: "proj-1".to_string(),
            project_name: None,
            task_name: "Report".to_string(),
            description: String::new(),
            start_time: Some(clock.now()),
            end_time: None,
            duration_hours: Some(1.0),
            status: None,
            tags: Vec::new(),
        };
        let created = tracker.log_manual_entry(&ctx, &draft).await.expect("create");

        let patch = TimeLogPatch {
            duration_hours: Some(3.0),
            ..TimeLogPatch::default()
        };
        let accepted = tracker
            .update_entry(&ctx, &created.id, &patch)
            .await
            .expect("update");
        assert!(accepted);
        assert_eq!(tracker.metrics().total_hours, 3.0);
        assert_eq!(tracker.entries().await[0].duration_hours, 3.0);
    }

    #[tokio::test]
    async fn running_timer_shows_up_in_metrics_until_stopped() {
        let store = seeded_store();
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(store, Arc::clone(&clock));
        let ctx = UserContext::new("user-1");
        tracker.load_session(&ctx).await.expect("load");

        tracker
            .start_timer(&ctx, "proj-1", "Deep work")
            .await
            .expect("start");
        assert_eq!(tracker.metrics().active_timers, 1);
        assert_eq!(tracker.metrics().completed_tasks, 0);

        clock.advance(ChronoDuration::minutes(90));
        tracker.stop_timer(&ctx).await.expect("stop");
        assert_eq!(tracker.metrics().active_timers, 0);
        assert_eq!(tracker.metrics().completed_tasks, 1);
        assert_eq!(tracker.metrics().total_hours, 1.5);
    }

    #[tokio::test]
    async fn failed_load_leaves_an_empty_degraded_session() {
        let store = seeded_store();
        store.set_online(false);
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(Arc::clone(&store), clock);
        let ctx = UserContext::new("user-1");

        tracker.load_session(&ctx).await.unwrap_err();
        assert!(tracker.is_degraded());
        assert!(tracker.entries().await.is_empty());
        assert_eq!(tracker.metrics(), TimeMetrics::default());

        // the retry path is simply another load
        store.set_online(true);
        tracker.load_session(&ctx).await.expect("reload");
        assert!(!tracker.is_degraded());
    }

    #[tokio::test]
    async fn filtered_entries_apply_search_and_sort() {
        let store = seeded_store();
        let clock = Arc::new(ManualClock::new(start_instant()));
        let tracker = core(store, Arc::clone(&clock));
        let ctx = UserContext::new("user-1");
        tracker.load_session(&ctx).await.expect("load");

        for (task, duration) in [("Standup", 0.25), ("Review", 1.0), ("Report", 2.0)] {
            let draft = TimeLogDraft {
                project_id: "proj-1".to_string(),
                project_name: None,
                task_name: task.to_string(),
                description: String::new(),
                start_time: Some(clock.now()),
                end_time: None,
                duration_hours: Some(duration),
                status: None,
                tags: Vec::new(),
            };
            tracker.log_manual_entry(&ctx, &draft).await.expect("create");
        }

        let filters = TimeLogFilters {
            search: Some("re".to_string()),
            ..TimeLogFilters::default()
        };
        let result = tracker
            .filtered_entries(&filters, SortKey::Duration, SortOrder::Desc)
            .await;
        let tasks: Vec<&str> = result.iter().map(|log| log.task_name.as_str()).collect();
        assert_eq!(tasks, ["Report", "Review"]);
    }
}
