//! Completed-session records kept by the history ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a session finishes without a task name.
pub const UNNAMED_TASK: &str = "unnamed task";

/// One finished work session. Immutable once logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Creation time in epoch millis, bumped when needed so ids stay
    /// strictly increasing within one ledger.
    pub id: i64,
    pub task_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub paused_time_ms: i64,
    pub work_time_ms: i64,
}

impl HistoryEntry {
    pub fn new(
        id: i64,
        task_name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        paused_time_ms: i64,
    ) -> Self {
        let paused_time_ms = paused_time_ms.max(0);
        Self {
            id,
            task_name: display_task_name(task_name).to_string(),
            start_time,
            end_time,
            paused_time_ms,
            work_time_ms: work_time_ms(start_time, end_time, paused_time_ms),
        }
    }
}

/// `(end - start) - paused`, never negative.
pub fn work_time_ms(start: DateTime<Utc>, end: DateTime<Utc>, paused_ms: i64) -> i64 {
    let wall_ms = (end - start).num_milliseconds();
    (wall_ms - paused_ms).max(0)
}

/// Task names are free-form mid-session; blank ones only get the
/// placeholder when they are logged or announced.
pub fn display_task_name(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNNAMED_TASK
    } else {
        trimmed
    }
}
