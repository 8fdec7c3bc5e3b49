use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Project, SyncState, TimeLog, TimeLogPatch, TimeLogStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const LOG_COLUMNS: &str = "id, user_id, project_id, project_name, task_name, description, start_time, end_time, duration_hours, status, tags_json";

// Durable single-file backend. Statements are single-row and fast, so the
// blocking rusqlite calls run inline on the caller task.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::Backend(err.into()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_project(&self, project: &Project) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO projects (id, title) VALUES (?1, ?2)",
            params![project.id, project.title],
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    fn fetch_time_log(conn: &Connection, id: &str) -> StoreResult<Option<TimeLog>> {
        let row = conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM time_logs WHERE id = ?1"),
                params![id],
                parse_log_row,
            )
            .optional()?;
        Ok(row)
    }

    fn write_time_log(conn: &Connection, log: &TimeLog) -> StoreResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO time_logs (id, user_id, project_id, project_name, task_name, description, start_time, end_time, duration_hours, status, tags_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                log.id,
                log.user_id,
                log.project_id,
                log.project_name,
                log.task_name,
                log.description,
                log.start_time.to_rfc3339(),
                log.end_time.map(|end| end.to_rfc3339()),
                log.duration_hours,
                log.status.as_str(),
                serde_json::to_string(&log.tags)?,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_time_logs(&self, user_id: &str) -> StoreResult<Vec<TimeLog>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM time_logs WHERE user_id = ?1 ORDER BY start_time ASC, id ASC"
        ))?;
        let rows = statement.query_map(params![user_id], parse_log_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?.sanitize());
        }
        Ok(result)
    }

    async fn create_time_log(&self, log: &TimeLog) -> StoreResult<TimeLog> {
        let mut stored = log.clone().sanitize();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        stored.sync = SyncState::Synced;
        let conn = self.lock()?;
        Self::write_time_log(&conn, &stored)?;
        Ok(stored)
    }

    async fn update_time_log(&self, id: &str, patch: &TimeLogPatch) -> StoreResult<bool> {
        let conn = self.lock()?;
        let Some(mut log) = Self::fetch_time_log(&conn, id)? else {
            return Ok(false);
        };
        patch.apply_to(&mut log);
        Self::write_time_log(&conn, &log.sanitize())?;
        Ok(true)
    }

    async fn delete_time_log(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM time_logs WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare("SELECT id, title FROM projects ORDER BY title ASC")?;
        let rows = statement.query_map([], |row| {
            Ok(Project {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn parse_log_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeLog> {
    let end_raw: Option<String> = row.get(7)?;
    let tags_raw: String = row.get(10)?;
    Ok(TimeLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        project_name: row.get(3)?,
        task_name: row.get(4)?,
        description: row.get(5)?,
        start_time: parse_time(&row.get::<_, String>(6)?)?,
        end_time: end_raw.as_deref().map(parse_time).transpose()?,
        duration_hours: row.get(8)?,
        status: parse_status(&row.get::<_, String>(9)?),
        tags: serde_json::from_str(&tags_raw).unwrap_or_default(),
        sync: SyncState::Synced,
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

fn parse_status(raw: &str) -> TimeLogStatus {
    match raw {
        "running" => TimeLogStatus::Running,
        "paused" => TimeLogStatus::Paused,
        "cancelled" => TimeLogStatus::Cancelled,
        _ => TimeLogStatus::Completed,
    }
}
