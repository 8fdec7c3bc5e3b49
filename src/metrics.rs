use crate::models::{TimeLog, TimeLogStatus};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Derived totals over a snapshot of the time log collection. Recomputed from
/// scratch after every relevant mutation; nothing in here is incremental.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeMetrics {
    pub total_hours: f64,
    pub today_hours: f64,
    pub week_hours: f64,
    pub month_hours: f64,
    pub active_timers: usize,
    pub completed_tasks: usize,
    pub average_session_hours: f64,
    pub productivity_percent: f64,
}

impl TimeMetrics {
    pub fn compute(logs: &[TimeLog], now: DateTime<Utc>, weekly_target_hours: f64) -> Self {
        Self::compute_in_zone(logs, now, weekly_target_hours, Local)
    }

    // "Today" is a calendar-date comparison in the given zone, not a rolling
    // 24 h window; week and month are rolling windows of 7 and 30 days. Sums
    // stay unrounded until the display fields are filled in.
    pub fn compute_in_zone<Tz: TimeZone>(
        logs: &[TimeLog],
        now: DateTime<Utc>,
        weekly_target_hours: f64,
        zone: Tz,
    ) -> Self {
        let today = now.with_timezone(&zone).date_naive();
        let week_floor = now - Duration::days(7);
        let month_floor = now - Duration::days(30);

        let mut total = 0.0;
        let mut today_sum = 0.0;
        let mut week = 0.0;
        let mut month = 0.0;
        let mut active_timers = 0;
        let mut completed_tasks = 0;

        for log in logs {
            total += log.duration_hours;
            if log.start_time.with_timezone(&zone).date_naive() == today {
                today_sum += log.duration_hours;
            }
            if log.start_time >= week_floor {
                week += log.duration_hours;
            }
            if log.start_time >= month_floor {
                month += log.duration_hours;
            }
            match log.status {
                TimeLogStatus::Running => active_timers += 1,
                TimeLogStatus::Completed => completed_tasks += 1,
                _ => {}
            }
        }

        let average = if completed_tasks > 0 {
            total / completed_tasks as f64
        } else {
            0.0
        };
        // not clamped to 100: overtime is a meaningful signal
        let productivity = if weekly_target_hours > 0.0 {
            (week / weekly_target_hours) * 100.0
        } else {
            0.0
        };

        Self {
            total_hours: round_tenth(total),
            today_hours: round_tenth(today_sum),
            week_hours: round_tenth(week),
            month_hours: round_tenth(month),
            active_timers,
            completed_tasks,
            average_session_hours: round_tenth(average),
            productivity_percent: round_tenth(productivity),
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
