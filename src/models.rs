use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeLogStatus {
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl TimeLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    #[default]
    Synced,
    LocalOnly,
    Dirty,
}

impl SyncState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::LocalOnly => "local-only",
            Self::Dirty => "dirty",
        }
    }
}

// Store payloads arrive with field spellings that drifted across sibling
// modules over time; the aliases accept the older names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    pub id: String,
    #[serde(alias = "project")]
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(alias = "title")]
    pub task_name: String,
    #[serde(default, alias = "notes")]
    pub description: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(alias = "start")]
    pub start_time: DateTime<Utc>,
    #[serde(default, alias = "stop")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "duration")]
    pub duration_hours: f64,
    #[serde(default = "default_log_status")]
    pub status: TimeLogStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sync: SyncState,
}

fn default_log_status() -> TimeLogStatus {
    TimeLogStatus::Completed
}

impl TimeLog {
    // Normalizes a record instead of rejecting it: negative or non-finite
    // durations clamp to zero and an end before the start is dropped.
    pub fn sanitize(mut self) -> Self {
        if !self.duration_hours.is_finite() || self.duration_hours < 0.0 {
            self.duration_hours = 0.0;
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                self.end_time = None;
            }
        }
        self
    }
}

pub(crate) fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 3_600_000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogDraft {
    pub project_id: String,
    #[serde(default)]
    pub project_name: Option<String>,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub status: Option<TimeLogStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogPatch {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_hours: Option<f64>,
    pub status: Option<TimeLogStatus>,
    pub tags: Option<Vec<String>>,
}

impl TimeLogPatch {
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.project_name.is_none()
            && self.task_name.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.duration_hours.is_none()
            && self.status.is_none()
            && self.tags.is_none()
    }

    pub fn apply_to(&self, log: &mut TimeLog) {
        if let Some(project_id) = &self.project_id {
            log.project_id = project_id.clone();
        }
        if let Some(project_name) = &self.project_name {
            log.project_name = project_name.clone();
        }
        if let Some(task_name) = &self.task_name {
            log.task_name = task_name.clone();
        }
        if let Some(description) = &self.description {
            log.description = description.clone();
        }
        if let Some(start_time) = self.start_time {
            log.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            log.end_time = Some(end_time);
        }
        if let Some(duration_hours) = self.duration_hours {
            log.duration_hours = duration_hours;
        }
        if let Some(status) = self.status {
            log.status = status;
        }
        if let Some(tags) = &self.tags {
            log.tags = tags.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog {
    projects: Vec<Project>,
}

impl ProjectCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn replace(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.projects.iter().any(|project| project.id == id)
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.projects
            .iter()
            .find(|project| project.id == id)
            .map(|project| project.title.as_str())
    }

    pub fn all(&self) -> &[Project] {
        &self.projects
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogFilters {
    pub search: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<TimeLogStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    StartTime,
    Duration,
    Project,
    Task,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerSettings {
    pub weekly_target_hours: f64,
    pub tick_interval_ms: u64,
    pub store_retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            weekly_target_hours: 40.0,
            tick_interval_ms: 1_000,
            store_retry_attempts: 2,
            retry_backoff_ms: 250,
        }
    }
}
