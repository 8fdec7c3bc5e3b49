use crate::models::{SortKey, SortOrder, TimeLog, TimeLogFilters};
use std::cmp::Ordering;

/// Applies the optional AND-combined filters, then a stable sort. Ties keep
/// the original collection order in both directions, so records with equal
/// keys never swap between refreshes.
pub fn apply(
    logs: &[TimeLog],
    filters: &TimeLogFilters,
    key: SortKey,
    order: SortOrder,
) -> Vec<TimeLog> {
    let mut result: Vec<TimeLog> = logs
        .iter()
        .filter(|log| matches(log, filters))
        .cloned()
        .collect();
    result.sort_by(|a, b| compare(a, b, key, order));
    result
}

fn matches(log: &TimeLog, filters: &TimeLogFilters) -> bool {
    if let Some(search) = &filters.search {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty()
            && !log.task_name.to_lowercase().contains(&needle)
            && !log.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(project_id) = &filters.project_id {
        if &log.project_id != project_id {
            return false;
        }
    }
    if let Some(status) = filters.status {
        if log.status != status {
            return false;
        }
    }
    if let Some(from) = filters.date_from {
        if log.start_time < from {
            return false;
        }
    }
    if let Some(to) = filters.date_to {
        if log.start_time > to {
            return false;
        }
    }
    true
}

// The comparator reverses for descending order instead of reversing the
// sorted output, which would also flip tied records.
fn compare(a: &TimeLog, b: &TimeLog, key: SortKey, order: SortOrder) -> Ordering {
    let ordering = match key {
        SortKey::StartTime => a.start_time.cmp(&b.start_time),
        SortKey::Duration => a.duration_hours.total_cmp(&b.duration_hours),
        SortKey::Project => a
            .project_name
            .to_lowercase()
            .cmp(&b.project_name.to_lowercase()),
        SortKey::Task => a.task_name.to_lowercase().cmp(&b.task_name.to_lowercase()),
    };
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncState, TimeLogStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    fn log(id: &str, project: &str, task: &str, offset_hours: i64, duration: f64) -> TimeLog {
        TimeLog {
            id: id.to_string(),
            project_id: format!("id-{project}"),
            project_name: project.to_string(),
            task_name: task.to_string(),
            description: format!("notes for {task}"),
            user_id: "user-1".to_string(),
            start_time: base() + Duration::hours(offset_hours),
            end_time: None,
            duration_hours: duration,
            status: TimeLogStatus::Completed,
            tags: Vec::new(),
            sync: SyncState::Synced,
        }
    }

    fn sample() -> Vec<TimeLog> {
        vec![
            log("a", "Internal", "Quarterly report", 0, 2.0),
            log("b", "client a", "Standup", 1, 0.5),
            log("c", "Internal", "Review", 2, 1.0),
            log("d", "Client A", "Deep work", 3, 3.5),
        ]
    }

    fn ids(logs: &[TimeLog]) -> Vec<&str> {
        logs.iter().map(|log| log.id.as_str()).collect()
    }

    #[test]
    fn empty_filters_return_a_permutation_of_the_collection() {
        let logs = sample();
        let result = apply(&logs, &TimeLogFilters::default(), SortKey::Duration, SortOrder::Desc);
        assert_eq!(result.len(), logs.len());
        let mut original: Vec<&str> = ids(&logs);
        let mut returned: Vec<&str> = ids(&result);
        original.sort_unstable();
        returned.sort_unstable();
        assert_eq!(original, returned);
    }

    #[test]
    fn blank_search_is_a_no_op() {
        let logs = sample();
        let filters = TimeLogFilters {
            search: Some("   ".to_string()),
            ..TimeLogFilters::default()
        };
        let result = apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc);
        assert_eq!(result.len(), logs.len());
    }

    #[test]
    fn search_matches_task_name_and_description_case_insensitively() {
        let logs = sample();
        let filters = TimeLogFilters {
            search: Some("QUARTERLY".to_string()),
            ..TimeLogFilters::default()
        };
        assert_eq!(ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)), ["a"]);

        let filters = TimeLogFilters {
            search: Some("notes for standup".to_string()),
            ..TimeLogFilters::default()
        };
        assert_eq!(ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)), ["b"]);
    }

    #[test]
    fn filters_are_and_combined() {
        let logs = sample();
        let filters = TimeLogFilters {
            search: Some("e".to_string()),
            project_id: Some("id-Internal".to_string()),
            ..TimeLogFilters::default()
        };
        assert_eq!(
            ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)),
            ["a", "c"]
        );
    }

    #[test]
    fn status_filter_matches_exactly() {
        let mut logs = sample();
        logs[2].status = TimeLogStatus::Running;
        let filters = TimeLogFilters {
            status: Some(TimeLogStatus::Running),
            ..TimeLogFilters::default()
        };
        assert_eq!(ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)), ["c"]);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let logs = sample();
        let filters = TimeLogFilters {
            date_from: Some(base() + Duration::hours(1)),
            date_to: Some(base() + Duration::hours(2)),
            ..TimeLogFilters::default()
        };
        assert_eq!(
            ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)),
            ["b", "c"]
        );
    }

    #[test]
    fn either_date_bound_may_be_absent() {
        let logs = sample();
        let filters = TimeLogFilters {
            date_from: Some(base() + Duration::hours(2)),
            ..TimeLogFilters::default()
        };
        assert_eq!(
            ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)),
            ["c", "d"]
        );

        let filters = TimeLogFilters {
            date_to: Some(base()),
            ..TimeLogFilters::default()
        };
        assert_eq!(ids(&apply(&logs, &filters, SortKey::StartTime, SortOrder::Asc)), ["a"]);
    }

    #[test]
    fn duration_sorts_numerically() {
        let logs = sample();
        let result = apply(&logs, &TimeLogFilters::default(), SortKey::Duration, SortOrder::Asc);
        assert_eq!(ids(&result), ["b", "c", "a", "d"]);
        let result = apply(&logs, &TimeLogFilters::default(), SortKey::Duration, SortOrder::Desc);
        assert_eq!(ids(&result), ["d", "a", "c", "b"]);
    }

    #[test]
    fn project_sort_ignores_case_and_keeps_ties_in_collection_order() {
        let logs = sample();
        let asc = apply(&logs, &TimeLogFilters::default(), SortKey::Project, SortOrder::Asc);
        // "client a" and "Client A" tie under the case-insensitive key
        assert_eq!(ids(&asc), ["b", "d", "a", "c"]);

        let desc = apply(&logs, &TimeLogFilters::default(), SortKey::Project, SortOrder::Desc);
        // descending flips the groups but not the tied pairs
        assert_eq!(ids(&desc), ["a", "c", "b", "d"]);
    }

    #[test]
    fn sorting_twice_yields_identical_output() {
        let logs = sample();
        let first = apply(&logs, &TimeLogFilters::default(), SortKey::Task, SortOrder::Desc);
        let second = apply(&logs, &TimeLogFilters::default(), SortKey::Task, SortOrder::Desc);
        assert_eq!(ids(&first), ids(&second));
    }
}
