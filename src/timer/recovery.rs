//! Startup reconciliation of a persisted timer snapshot against the clock.
//!
//! The snapshot only stores instants, so a countdown that kept "running"
//! while the process was gone is recovered exactly: the anchor either still
//! lies ahead (resume) or has passed (the session finished unobserved).

use chrono::{DateTime, Duration, Utc};

use crate::models::TimerDocument;

use super::state::{
    from_epoch_millis, remaining_from_anchor, DurationInput, SessionConfig, SessionRuntime,
    TimerStatus, DEFAULT_DURATION_SECS, MAX_DURATION_SECS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing worth restoring.
    Fresh,
    /// Countdown still ahead of the clock; re-anchor the ticker.
    Running {
        config: SessionConfig,
        runtime: SessionRuntime,
    },
    /// Anchor already passed; the caller must run the natural finish.
    Overdue {
        config: SessionConfig,
        runtime: SessionRuntime,
    },
    Paused {
        config: SessionConfig,
        runtime: SessionRuntime,
    },
}

pub fn classify(document: Option<TimerDocument>, now: DateTime<Utc>) -> Recovery {
    let Some(doc) = document else {
        return Recovery::Fresh;
    };

    let config = SessionConfig {
        total_duration_secs: if doc.total_seconds > 0 {
            DurationInput::Exact(doc.total_seconds).to_seconds()
        } else {
            DEFAULT_DURATION_SECS
        },
        task_name: doc.task_name.clone(),
    };

    let target_end = doc.target_end_time.and_then(from_epoch_millis);
    if let (true, Some(target_end)) = (doc.is_running, target_end) {
        let remaining = remaining_from_anchor(target_end, now);
        let runtime = SessionRuntime {
            remaining_secs: remaining,
            status: TimerStatus::Running,
            target_end: Some(target_end),
            session_start: Some(
                doc.session_start_time
                    .unwrap_or(target_end - Duration::seconds(config.total_duration_secs)),
            ),
            pause_start: None,
            total_paused_ms: doc.total_paused_time.max(0),
            linked_backlog_task_id: doc.current_backlog_task_id,
        };
        return if remaining > 0 {
            Recovery::Running { config, runtime }
        } else {
            Recovery::Overdue { config, runtime }
        };
    }

    if doc.remaining_seconds > 0 {
        let runtime = SessionRuntime {
            remaining_secs: doc.remaining_seconds.min(MAX_DURATION_SECS),
            status: TimerStatus::Paused,
            target_end: None,
            session_start: Some(doc.session_start_time.unwrap_or(now)),
            // The time the process was gone still counts as paused.
            pause_start: Some(doc.pause_start_time.and_then(from_epoch_millis).unwrap_or(now)),
            total_paused_ms: doc.total_paused_time.max(0),
            linked_backlog_task_id: doc.current_backlog_task_id,
        };
        return Recovery::Paused { config, runtime };
    }

    Recovery::Fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn running_doc(target_end: DateTime<Utc>) -> TimerDocument {
        TimerDocument {
            target_end_time: Some(target_end.timestamp_millis()),
            total_seconds: 1500,
            remaining_seconds: 1500,
            is_running: true,
            session_start_time: Some(target_end - Duration::seconds(1500)),
            total_paused_time: 30_000,
            task_name: "Write report".into(),
            current_backlog_task_id: Some("b-1".into()),
            ..TimerDocument::default()
        }
    }

    #[test]
    fn missing_snapshot_is_fresh() {
        assert_eq!(classify(None, now()), Recovery::Fresh);
    }

    #[test]
    fn future_anchor_resumes_running() {
        let doc = running_doc(now() + Duration::seconds(600));

        let Recovery::Running { config, runtime } = classify(Some(doc), now()) else {
            panic!("expected running recovery");
        };
        assert_eq!(config.task_name, "Write report");
        assert_eq!(runtime.remaining_secs, 600);
        assert_eq!(runtime.total_paused_ms, 30_000);
        assert_eq!(runtime.linked_backlog_task_id.as_deref(), Some("b-1"));
        assert!(runtime.is_in_progress());
    }

    #[test]
    fn past_anchor_is_overdue() {
        let doc = running_doc(now() - Duration::seconds(1));

        let Recovery::Overdue { runtime, .. } = classify(Some(doc), now()) else {
            panic!("expected overdue recovery");
        };
        assert_eq!(runtime.remaining_secs, 0);
        assert_eq!(runtime.status, TimerStatus::Running);
    }

    #[test]
    fn paused_snapshot_keeps_pause_start() {
        let paused_at = now() - Duration::minutes(10);
        let doc = TimerDocument {
            total_seconds: 1500,
            remaining_seconds: 700,
            is_running: false,
            session_start_time: Some(now() - Duration::minutes(30)),
            pause_start_time: Some(paused_at.timestamp_millis()),
            task_name: "Review".into(),
            ..TimerDocument::default()
        };

        let Recovery::Paused { runtime, .. } = classify(Some(doc), now()) else {
            panic!("expected paused recovery");
        };
        assert_eq!(runtime.remaining_secs, 700);
        assert_eq!(runtime.pause_start, Some(paused_at));
        assert!(runtime.target_end.is_none());
    }

    #[test]
    fn running_flag_without_anchor_falls_back_to_paused() {
        let doc = TimerDocument {
            remaining_seconds: 90,
            is_running: true,
            ..TimerDocument::default()
        };

        let Recovery::Paused { config, runtime } = classify(Some(doc), now()) else {
            panic!("expected paused recovery");
        };
        assert_eq!(config.total_duration_secs, DEFAULT_DURATION_SECS);
        assert_eq!(runtime.pause_start, Some(now()));
        assert_eq!(runtime.session_start, Some(now()));
    }

    #[test]
    fn empty_snapshot_is_fresh() {
        assert_eq!(classify(Some(TimerDocument::default()), now()), Recovery::Fresh);
    }
}
