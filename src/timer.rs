use crate::clock::Clock;
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{
    hours_between, TimeLog, TimeLogDraft, TimeLogPatch, TimeLogStatus, TrackerSettings,
    UserContext,
};
use crate::repository::TimeLogRepository;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

#[derive(Debug, Clone)]
pub enum TimerState {
    Idle,
    /// Carries the running record as created by the repository.
    Running(TimeLog),
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

struct TimerInner {
    state: TimerState,
    // Lives exactly as long as the Running state; stop/cancel abort it under
    // the same lock that flips the state.
    tick_task: Option<JoinHandle<()>>,
}

struct TimerShared {
    inner: Mutex<TimerInner>,
    clock: Arc<dyn Clock>,
    elapsed: watch::Sender<f64>,
}

impl TimerShared {
    // Elapsed time is always derived from the fixed start point, never
    // accumulated across ticks, so tick jitter cannot drift the display.
    async fn tick(&self) -> Option<f64> {
        let inner = self.inner.lock().await;
        let TimerState::Running(log) = &inner.state else {
            return None;
        };
        let elapsed = hours_between(log.start_time, self.clock.now());
        self.elapsed.send_replace(elapsed);
        Some(elapsed)
    }
}

/// At most one running timer per engine. `start` creates the running record
/// through the repository, `stop`/`cancel` finalize it; a store outage never
/// blocks either transition.
pub struct TimerEngine {
    shared: Arc<TimerShared>,
    repository: Arc<TimeLogRepository>,
    settings: TrackerSettings,
}

impl TimerEngine {
    pub fn new(
        repository: Arc<TimeLogRepository>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        let (elapsed, _) = watch::channel(0.0);
        Self {
            shared: Arc::new(TimerShared {
                inner: Mutex::new(TimerInner {
                    state: TimerState::Idle,
                    tick_task: None,
                }),
                clock,
                elapsed,
            }),
            repository,
            settings,
        }
    }

    pub async fn start(
        &self,
        ctx: &UserContext,
        project_id: &str,
        task_name: &str,
    ) -> TrackerResult<TimeLog> {
        let mut inner = self.shared.inner.lock().await;
        if let TimerState::Running(active) = &inner.state {
            return Err(TrackerError::TimerAlreadyRunning(format!(
                "already tracking {}",
                active.task_name
            )));
        }

        let draft = TimeLogDraft {
            project_id: project_id.to_string(),
            project_name: None,
            task_name: task_name.to_string(),
            description: String::new(),
            start_time: Some(self.shared.clock.now()),
            end_time: None,
            duration_hours: Some(0.0),
            status: Some(TimeLogStatus::Running),
            tags: Vec::new(),
        };
        let record = self.repository.create(ctx, &draft).await?;

        self.shared.elapsed.send_replace(0.0);
        inner.state = TimerState::Running(record.clone());
        inner.tick_task = Some(self.spawn_tick_task());
        tracing::info!(log_id = %record.id, project_id = %record.project_id, "timer started");
        Ok(record)
    }

    /// Finalizes the running record as completed with
    /// `duration = end - start` in hours.
    pub async fn stop(&self, ctx: &UserContext) -> TrackerResult<TimeLog> {
        self.finish(ctx, TimeLogStatus::Completed).await
    }

    /// Discards the running interval: the record is finalized as cancelled
    /// with zero duration.
    pub async fn cancel(&self, ctx: &UserContext) -> TrackerResult<TimeLog> {
        self.finish(ctx, TimeLogStatus::Cancelled).await
    }

    /// Display-only recomputation of the elapsed hours; `None` when idle, so
    /// a tick that fires after a stop is a no-op.
    pub async fn tick(&self) -> Option<f64> {
        self.shared.tick().await
    }

    /// Re-enters `Running` over records a previous session left behind, so
    /// stopping stays reachable across a restart. The newest running record
    /// wins; the rest are finalized as cancelled. No-op for the record that
    /// is already active.
    pub async fn adopt(&self, ctx: &UserContext, running: Vec<TimeLog>) -> Option<TimeLog> {
        let mut inner = self.shared.inner.lock().await;
        let active_id = match &inner.state {
            TimerState::Running(log) => Some(log.id.clone()),
            TimerState::Idle => None,
        };

        let mut candidates: Vec<TimeLog> = running
            .into_iter()
            .filter(|log| log.status == TimeLogStatus::Running)
            .filter(|log| Some(&log.id) != active_id.as_ref())
            .collect();
        candidates.sort_by_key(|log| log.start_time);
        let adopted = if active_id.is_none() {
            candidates.pop()
        } else {
            None
        };

        for stale in candidates {
            let patch = TimeLogPatch {
                end_time: Some(self.shared.clock.now()),
                duration_hours: Some(0.0),
                status: Some(TimeLogStatus::Cancelled),
                ..TimeLogPatch::default()
            };
            match self.repository.update(ctx, &stale.id, &patch).await {
                Ok(_) => {
                    tracing::warn!(log_id = %stale.id, "cancelled stale running record from previous session");
                }
                Err(error) => {
                    tracing::warn!(log_id = %stale.id, error = %error, "could not finalize stale running record");
                }
            }
        }

        let log = adopted?;
        self.shared
            .elapsed
            .send_replace(hours_between(log.start_time, self.shared.clock.now()));
        inner.state = TimerState::Running(log.clone());
        inner.tick_task = Some(self.spawn_tick_task());
        tracing::info!(log_id = %log.id, "adopted running timer from previous session");
        Some(log)
    }

    pub async fn state(&self) -> TimerState {
        self.shared.inner.lock().await.state.clone()
    }

    /// Latest display elapsed hours; resets to 0 when the timer leaves
    /// `Running`.
    pub fn elapsed_watch(&self) -> watch::Receiver<f64> {
        self.shared.elapsed.subscribe()
    }

    async fn finish(&self, ctx: &UserContext, status: TimeLogStatus) -> TrackerResult<TimeLog> {
        let mut inner = self.shared.inner.lock().await;
        let TimerState::Running(active) = inner.state.clone() else {
            return Err(TrackerError::TimerNotRunning(
                "no timer is running".to_string(),
            ));
        };

        let end_time = self.shared.clock.now();
        let duration_hours = match status {
            TimeLogStatus::Completed => hours_between(active.start_time, end_time),
            _ => 0.0,
        };

        // Leave Running before the store round trip: the elapsed display must
        // reset immediately and a late tick must find Idle.
        inner.state = TimerState::Idle;
        if let Some(task) = inner.tick_task.take() {
            task.abort();
        }
        self.shared.elapsed.send_replace(0.0);
        drop(inner);

        let log_id = active.id.clone();
        let patch = TimeLogPatch {
            end_time: Some(end_time),
            duration_hours: Some(duration_hours),
            status: Some(status),
            ..TimeLogPatch::default()
        };
        if let Err(error) = self.repository.update(ctx, &log_id, &patch).await {
            tracing::warn!(log_id = %log_id, error = %error, "running record missing at finalize");
        }

        let finalized = match self.repository.find(&log_id).await {
            Some(log) => log,
            None => {
                let mut log = active;
                patch.apply_to(&mut log);
                log
            }
        };
        tracing::info!(
            log_id = %finalized.id,
            status = status.as_str(),
            hours = duration_hours,
            "timer finished"
        );
        Ok(finalized)
    }

    fn spawn_tick_task(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let period = Duration::from_millis(self.settings.tick_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if shared.tick().await.is_none() {
                    break;
                }
            }
        })
    }
}
