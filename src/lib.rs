pub mod clock;
pub mod errors;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod store;
pub mod timer;
pub mod tracker;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::errors::{TrackerError, TrackerResult};
pub use crate::metrics::TimeMetrics;
pub use crate::models::{
    Project, ProjectCatalog, SortKey, SortOrder, SyncState, TimeLog, TimeLogDraft, TimeLogFilters,
    TimeLogPatch, TimeLogStatus, TrackerSettings, UserContext,
};
pub use crate::repository::TimeLogRepository;
pub use crate::store::memory::MemoryStore;
pub use crate::store::sqlite::SqliteStore;
pub use crate::store::{RecordStore, StoreError, StoreResult};
pub use crate::timer::{TimerEngine, TimerState};
pub use crate::tracker::TrackerCore;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
