use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TimerDocument;

pub const MIN_DURATION_SECS: i64 = 60;
pub const MAX_DURATION_SECS: i64 = 60 * 60;
pub const DEFAULT_DURATION_SECS: i64 = 25 * 60;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    /// Countdown reached zero and is waiting for Finish or Extend.
    Finished,
}

/// Where a requested duration came from. Everything except direct numeric
/// input snaps to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationInput {
    /// Presets and backlog tasks.
    Minutes(i64),
    /// Free-form seconds from the dial, rounded to the nearest minute.
    Dial(i64),
    /// Typed `MM:SS`, kept to the second.
    Exact(i64),
}

impl DurationInput {
    pub fn to_seconds(self) -> i64 {
        let seconds = match self {
            DurationInput::Minutes(minutes) => minutes.saturating_mul(60),
            DurationInput::Dial(seconds) => ((seconds as f64 / 60.0).round() as i64).saturating_mul(60),
            DurationInput::Exact(seconds) => seconds,
        };
        seconds.clamp(MIN_DURATION_SECS, MAX_DURATION_SECS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub total_duration_secs: i64,
    pub task_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_duration_secs: DEFAULT_DURATION_SECS,
            task_name: String::new(),
        }
    }
}

/// Mutable countdown state. While Running, `remaining_secs` is always
/// derived from `target_end`; it is never decremented per tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRuntime {
    pub remaining_secs: i64,
    pub status: TimerStatus,
    pub target_end: Option<DateTime<Utc>>,
    pub session_start: Option<DateTime<Utc>>,
    pub pause_start: Option<DateTime<Utc>>,
    pub total_paused_ms: i64,
    pub linked_backlog_task_id: Option<String>,
}

/// Bookkeeping handed back when a session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub paused_ms: i64,
    pub backlog_task_id: Option<String>,
}

/// Whole seconds left until `target_end`, rounded up, never negative.
pub fn remaining_from_anchor(target_end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (target_end - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 999) / 1000
    }
}

impl SessionRuntime {
    pub fn idle(remaining_secs: i64) -> Self {
        Self {
            remaining_secs: remaining_secs.max(0),
            status: TimerStatus::Idle,
            target_end: None,
            session_start: None,
            pause_start: None,
            total_paused_ms: 0,
            linked_backlog_task_id: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Starts or resumes the countdown. Returns false when there is nothing
    /// to count down or it is already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.remaining_secs <= 0 || self.status == TimerStatus::Running {
            return false;
        }

        if self.session_start.is_none() {
            self.session_start = Some(now);
            self.total_paused_ms = 0;
        }
        self.fold_pause(now);

        self.target_end = Some(now + Duration::seconds(self.remaining_secs));
        self.status = TimerStatus::Running;
        true
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.sync_from_anchor(now);
        self.pause_start = Some(now);
        self.target_end = None;
        self.status = TimerStatus::Paused;
        true
    }

    /// Recomputes `remaining_secs` from the anchor. Shared by the periodic
    /// tick and the foreground resync so both agree.
    pub fn sync_from_anchor(&mut self, now: DateTime<Utc>) -> i64 {
        if let (TimerStatus::Running, Some(target_end)) = (self.status, self.target_end) {
            self.remaining_secs = remaining_from_anchor(target_end, now);
        }
        self.remaining_secs
    }

    /// Moves an in-progress pause into `total_paused_ms`.
    pub fn fold_pause(&mut self, now: DateTime<Utc>) {
        if let Some(pause_start) = self.pause_start.take() {
            let paused = (now - pause_start).num_milliseconds().max(0);
            self.total_paused_ms = self.total_paused_ms.saturating_add(paused);
        }
    }

    /// Ends the current session at `ended_at` and clears every session
    /// field. The caller decides the resulting status and remaining time.
    pub fn close(&mut self, ended_at: DateTime<Utc>) -> Option<ClosedSession> {
        let started_at = self.session_start.take()?;
        self.fold_pause(ended_at);
        let closed = ClosedSession {
            started_at,
            ended_at,
            paused_ms: self.total_paused_ms,
            backlog_task_id: self.linked_backlog_task_id.take(),
        };
        self.target_end = None;
        self.total_paused_ms = 0;
        Some(closed)
    }

    pub fn to_document(&self, config: &SessionConfig) -> TimerDocument {
        TimerDocument {
            target_end_time: self.target_end.map(|t| t.timestamp_millis()),
            total_seconds: config.total_duration_secs,
            remaining_seconds: self.remaining_secs,
            is_running: self.status == TimerStatus::Running,
            session_start_time: self.session_start,
            pause_start_time: self.pause_start.map(|t| t.timestamp_millis()),
            total_paused_time: self.total_paused_ms,
            task_name: config.task_name.clone(),
            current_backlog_task_id: self.linked_backlog_task_id.clone(),
        }
    }
}

pub(crate) fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
