use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    ledger::DayGroup,
    models::{BacklogTask, HistoryEntry},
};

use super::{BacklogSelection, DurationInput, Session, SessionView, TimerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Async front door to a [`Session`]. Clones share one session and one
/// ticker; every call runs to completion under the session lock, so the
/// event timeline stays single-threaded.
#[derive(Clone)]
pub struct TimerController {
    session: Arc<Mutex<Session>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(session: Session, tick_interval: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    /// Re-anchors the ticker when recovery left the session running.
    pub async fn resume_after_recovery(&self) {
        if self.session.lock().await.status() == TimerStatus::Running {
            self.spawn_ticker().await;
        }
    }

    pub async fn view(&self) -> SessionView {
        self.session.lock().await.view()
    }

    pub async fn remaining_secs(&self) -> i64 {
        self.session.lock().await.remaining_secs()
    }

    pub async fn status(&self) -> TimerStatus {
        self.session.lock().await.status()
    }

    pub async fn configure(&self, input: DurationInput, task_name: &str) -> Result<SessionView> {
        let mut session = self.session.lock().await;
        session.configure(input, task_name)?;
        Ok(session.view())
    }

    pub async fn set_task_name(&self, name: &str) -> Result<SessionView> {
        let mut session = self.session.lock().await;
        session.set_task_name(name)?;
        Ok(session.view())
    }

    pub async fn start(&self) -> SessionView {
        let (started, view) = {
            let mut session = self.session.lock().await;
            let started = session.start();
            (started, session.view())
        };
        if started {
            self.spawn_ticker().await;
        }
        view
    }

    pub async fn pause(&self) -> Result<SessionView> {
        let view = {
            let mut session = self.session.lock().await;
            session.pause()?;
            session.view()
        };
        self.cancel_ticker().await;
        Ok(view)
    }

    /// Start/pause button.
    pub async fn toggle(&self) -> Result<SessionView> {
        if self.status().await == TimerStatus::Running {
            self.pause().await
        } else {
            Ok(self.start().await)
        }
    }

    pub async fn finish(&self) -> Result<Option<HistoryEntry>> {
        let result = self.session.lock().await.finish();
        self.cancel_ticker().await;
        result
    }

    pub async fn finish_early(&self) -> Result<HistoryEntry> {
        let result = self.session.lock().await.finish_early();
        self.cancel_ticker().await;
        result
    }

    pub async fn extend(&self, minutes: i64) -> Result<SessionView> {
        let view = {
            let mut session = self.session.lock().await;
            session.extend(minutes)?;
            session.view()
        };
        self.spawn_ticker().await;
        Ok(view)
    }

    pub async fn reset(&self) -> Option<HistoryEntry> {
        let entry = self.session.lock().await.reset();
        self.cancel_ticker().await;
        entry
    }

    /// Visibility regained: recompute now instead of waiting for the next
    /// tick, which may be far off in a throttled context.
    pub async fn resync(&self) -> SessionView {
        let (running, view) = {
            let mut session = self.session.lock().await;
            session.resync();
            (session.status() == TimerStatus::Running, session.view())
        };
        if !running {
            self.cancel_ticker().await;
        }
        view
    }

    pub async fn select_backlog_task(&self, id: &str, confirm_discard: bool) -> Result<BacklogSelection> {
        let selection = self
            .session
            .lock()
            .await
            .select_backlog_task(id, confirm_discard)?;
        if matches!(selection, BacklogSelection::Selected(_)) {
            self.cancel_ticker().await;
        }
        Ok(selection)
    }

    pub async fn add_backlog_task(&self, name: &str, minutes: u32) -> Result<BacklogTask> {
        self.session.lock().await.add_backlog_task(name, minutes)
    }

    pub async fn delete_backlog_task(&self, id: &str) -> bool {
        self.session.lock().await.delete_backlog_task(id)
    }

    pub async fn backlog(&self) -> Vec<BacklogTask> {
        self.session.lock().await.backlog().tasks().to_vec()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.session.lock().await.history().entries().to_vec()
    }

    pub async fn today(&self) -> Vec<HistoryEntry> {
        self.session.lock().await.today()
    }

    pub async fn archive(&self) -> Vec<DayGroup> {
        self.session.lock().await.archive()
    }

    pub async fn delete_history_entry(&self, id: i64) -> bool {
        self.session.lock().await.delete_history_entry(id)
    }

    pub async fn clear_history(&self) {
        self.session.lock().await.clear_history();
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let session = self.session.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let mut guard = session.lock().await;
                if guard.status() != TimerStatus::Running {
                    log_debug!("Ticker stopping: timer is {:?}", guard.status());
                    break;
                }
                if let Some(entry) = guard.tick() {
                    log_info!(
                        "Countdown for '{}' reached zero after {}ms of work",
                        entry.task_name,
                        entry.work_time_ms
                    );
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
