//! The two persisted documents.
//!
//! They live under separate keys so a broken timer snapshot never takes the
//! history down with it. Every field defaults so older or partial documents
//! still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BacklogTask, HistoryEntry};

pub const GENERAL_STATE_KEY: &str = "focusdial.general";
pub const TIMER_STATE_KEY: &str = "focusdial.timer";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralState {
    pub task_name: String,
    pub work_history: Vec<HistoryEntry>,
    pub task_backlog: Vec<BacklogTask>,
}

/// Snapshot of an in-progress session. Instants other than the session
/// start are epoch millis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerDocument {
    pub target_end_time: Option<i64>,
    pub total_seconds: i64,
    pub remaining_seconds: i64,
    pub is_running: bool,
    pub session_start_time: Option<DateTime<Utc>>,
    pub pause_start_time: Option<i64>,
    pub total_paused_time: i64,
    pub task_name: String,
    pub current_backlog_task_id: Option<String>,
}
