use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    backlog::BacklogQueue,
    clock::Clock,
    ledger::{DayGroup, HistoryLedger},
    models::{
        BacklogTask, GeneralState, HistoryEntry, TimerDocument, GENERAL_STATE_KEY,
        TIMER_STATE_KEY,
    },
    notify::{CompletionSignal, RenderHooks},
    storage::{load_document, save_document, KeyValueStore},
};

use super::{
    recovery::{classify, Recovery},
    state::{ClosedSession, DurationInput, SessionConfig, SessionRuntime, TimerStatus},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Collaborators a session talks to. Built once per application instance.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub signal: Arc<dyn CompletionSignal>,
    pub hooks: Arc<dyn RenderHooks>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacklogSelection {
    Selected(SessionConfig),
    /// A session is in progress; call again with confirmation to discard it.
    NeedsConfirmation,
}

/// What the dial and buttons render against.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: TimerStatus,
    pub remaining_secs: i64,
    pub total_duration_secs: i64,
    pub task_name: String,
    pub task_name_editable: bool,
    pub session_in_progress: bool,
    pub linked_backlog_task_id: Option<String>,
}

/// A natural finish is logged the moment the countdown hits zero so a crash
/// cannot lose it. Extend withdraws the entry and reopens the session.
#[derive(Debug, Clone)]
struct ProvisionalFinish {
    entry_id: i64,
    closed: ClosedSession,
    backlog_slot: Option<(usize, BacklogTask)>,
}

/// The timer state machine together with the ledger and backlog it feeds.
///
/// Every state-affecting transition writes its document back to the store;
/// write failures are logged and the in-memory transition stands.
pub struct Session {
    config: SessionConfig,
    runtime: SessionRuntime,
    ledger: HistoryLedger,
    backlog: BacklogQueue,
    provisional: Option<ProvisionalFinish>,
    ctx: SessionContext,
}

impl Session {
    /// A blank session that ignores whatever is persisted.
    pub fn new(ctx: SessionContext, config: SessionConfig) -> Self {
        let runtime = SessionRuntime::idle(config.total_duration_secs);
        Self {
            config,
            runtime,
            ledger: HistoryLedger::new(),
            backlog: BacklogQueue::new(),
            provisional: None,
            ctx,
        }
    }

    /// Loads both persisted documents and reconciles the timer snapshot with
    /// the current time. Never fails: unreadable documents fall back to
    /// defaults.
    pub fn restore(ctx: SessionContext, defaults: SessionConfig) -> Self {
        let mut session = Self::new(ctx, defaults);

        match load_document::<GeneralState>(session.ctx.store.as_ref(), GENERAL_STATE_KEY) {
            Ok(Some(general)) => {
                session.config.task_name = general.task_name;
                session.ledger = HistoryLedger::from_entries(general.work_history);
                session.backlog = BacklogQueue::from_tasks(general.task_backlog);
            }
            Ok(None) => {}
            Err(err) => log_warn!("Ignoring unreadable general state: {err:#}"),
        }

        let document =
            match load_document::<TimerDocument>(session.ctx.store.as_ref(), TIMER_STATE_KEY) {
                Ok(document) => document,
                Err(err) => {
                    log_warn!("Ignoring unreadable timer snapshot: {err:#}");
                    session.clear_runtime_snapshot();
                    None
                }
            };

        let now = session.ctx.clock.now();
        match classify(document, now) {
            Recovery::Fresh => {}
            Recovery::Running { config, runtime } => {
                log_info!(
                    "Recovered running timer for '{}' with {}s left",
                    config.task_name,
                    runtime.remaining_secs
                );
                session.config = config;
                session.runtime = runtime;
            }
            Recovery::Paused { config, runtime } => {
                log_info!(
                    "Recovered paused timer for '{}' with {}s left",
                    config.task_name,
                    runtime.remaining_secs
                );
                session.config = config;
                session.runtime = runtime;
            }
            Recovery::Overdue { config, runtime } => {
                log_info!(
                    "Timer for '{}' finished while the app was closed",
                    config.task_name
                );
                session.config = config;
                session.runtime = runtime;
                session.complete_naturally(now);
            }
        }

        session
    }

    pub fn status(&self) -> TimerStatus {
        self.runtime.status
    }

    pub fn remaining_secs(&self) -> i64 {
        self.runtime.remaining_secs
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn runtime(&self) -> &SessionRuntime {
        &self.runtime
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn backlog(&self) -> &BacklogQueue {
        &self.backlog
    }

    /// The task name is locked from Start until the session is logged or
    /// discarded.
    pub fn task_name_editable(&self) -> bool {
        !self.runtime.is_in_progress()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.runtime.status,
            remaining_secs: self.runtime.remaining_secs,
            total_duration_secs: self.config.total_duration_secs,
            task_name: self.config.task_name.clone(),
            task_name_editable: self.task_name_editable(),
            session_in_progress: self.runtime.is_in_progress(),
            linked_backlog_task_id: self.runtime.linked_backlog_task_id.clone(),
        }
    }

    pub fn today(&self) -> Vec<HistoryEntry> {
        self.ledger.today(self.ctx.clock.now())
    }

    pub fn archive(&self) -> Vec<DayGroup> {
        self.ledger.archive()
    }

    /// Chooses a countdown length and task name. Rejected while running.
    /// Mid-session (paused) only the length changes; otherwise the countdown
    /// is reset to the new length.
    pub fn configure(&mut self, input: DurationInput, task_name: &str) -> Result<()> {
        if self.runtime.is_running() {
            bail!("cannot reconfigure a running timer");
        }

        self.config.total_duration_secs = input.to_seconds();
        if self.runtime.is_in_progress() {
            self.persist_runtime();
            return Ok(());
        }

        self.config.task_name = task_name.to_string();
        let linked = self.runtime.linked_backlog_task_id.take();
        let linked = self.link_if_named(linked, task_name);
        self.return_to_idle(linked);
        log_debug!(
            "Configured {}s for '{}'",
            self.config.total_duration_secs,
            self.config.task_name
        );
        self.persist_general();
        Ok(())
    }

    pub fn set_task_name(&mut self, name: &str) -> Result<()> {
        if !self.task_name_editable() {
            bail!("task name is locked while a session is in progress");
        }
        self.config.task_name = name.to_string();
        let linked = self.runtime.linked_backlog_task_id.take();
        self.runtime.linked_backlog_task_id = self.link_if_named(linked, name);
        self.persist_general();
        Ok(())
    }

    /// A backlog link survives only while the task name still matches the
    /// linked task.
    fn link_if_named(&self, linked: Option<String>, name: &str) -> Option<String> {
        linked.filter(|id| {
            self.backlog
                .get(id)
                .is_some_and(|task| task.name == name.trim())
        })
    }

    /// Starts a fresh session or resumes a paused one. Returns false when
    /// nothing changed (already running, or no time left).
    pub fn start(&mut self) -> bool {
        let now = self.ctx.clock.now();
        let fresh = !self.runtime.is_in_progress();
        if !self.runtime.start(now) {
            return false;
        }

        log_info!(
            "Timer {} for '{}' with {}s left",
            if fresh { "started" } else { "resumed" },
            self.config.task_name,
            self.runtime.remaining_secs
        );
        self.persist_runtime();
        true
    }

    /// Periodic recompute. Returns the logged entry when this tick completed
    /// the countdown.
    pub fn tick(&mut self) -> Option<HistoryEntry> {
        let now = self.ctx.clock.now();
        self.refresh(now)
    }

    /// Catch-up after the host regains foreground; same math as `tick`.
    pub fn resync(&mut self) -> Option<HistoryEntry> {
        let now = self.ctx.clock.now();
        let finished = self.refresh(now);
        log_debug!("Resynced countdown: {}s left", self.runtime.remaining_secs);
        finished
    }

    fn refresh(&mut self, now: DateTime<Utc>) -> Option<HistoryEntry> {
        if !self.runtime.is_running() {
            return None;
        }
        if self.runtime.sync_from_anchor(now) > 0 {
            return None;
        }
        self.complete_naturally(now)
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.runtime.is_running() {
            bail!("timer is not running");
        }
        let now = self.ctx.clock.now();
        if self.refresh(now).is_some() {
            // Ran out before the pause landed.
            return Ok(());
        }

        self.runtime.pause(now);
        log_info!(
            "Timer paused for '{}' with {}s left",
            self.config.task_name,
            self.runtime.remaining_secs
        );
        self.persist_runtime();
        Ok(())
    }

    /// User-requested completion of a running or paused session: logs it and
    /// returns straight to Idle without the completion signal. A countdown
    /// that already ran out unobserved finishes naturally first, and this
    /// call acknowledges it.
    pub fn finish_early(&mut self) -> Result<HistoryEntry> {
        let now = self.ctx.clock.now();
        if let Some(entry) = self.refresh(now) {
            self.acknowledge()?;
            return Ok(entry);
        }

        let closed = self
            .runtime
            .close(now)
            .ok_or_else(|| anyhow!("no session in progress"))?;

        let (entry, _) = self.log_closed(&closed, now);
        self.return_to_idle(None);
        self.clear_runtime_snapshot();
        log_info!(
            "Session '{}' completed early after {}ms of work",
            entry.task_name,
            entry.work_time_ms
        );
        Ok(entry)
    }

    /// The Finish button: acknowledges a finished countdown, or completes an
    /// in-progress one early.
    pub fn finish(&mut self) -> Result<Option<HistoryEntry>> {
        if self.runtime.status == TimerStatus::Finished {
            self.acknowledge()?;
            return Ok(None);
        }
        self.finish_early().map(Some)
    }

    pub fn acknowledge(&mut self) -> Result<()> {
        if self.runtime.status != TimerStatus::Finished {
            bail!("timer has not finished");
        }
        self.return_to_idle(None);
        Ok(())
    }

    /// Adds time after a natural finish and keeps going as the same session:
    /// the provisional entry is withdrawn, the backlog task goes back to its
    /// slot, and the whole session is logged once at its final finish.
    pub fn extend(&mut self, minutes: i64) -> Result<()> {
        if self.runtime.status != TimerStatus::Finished {
            bail!("only a finished timer can be extended");
        }
        let provisional = self
            .provisional
            .take()
            .ok_or_else(|| anyhow!("finished session was already acknowledged"))?;

        let history_changed = self.ledger.delete(provisional.entry_id);
        let backlog_changed = provisional
            .backlog_slot
            .map(|(index, task)| self.backlog.reinsert(index, task))
            .unwrap_or(false);

        let seconds = DurationInput::Minutes(minutes).to_seconds();
        let closed = provisional.closed;
        self.config.total_duration_secs = seconds;
        self.runtime = SessionRuntime {
            remaining_secs: seconds,
            status: TimerStatus::Finished,
            target_end: None,
            session_start: Some(closed.started_at),
            // Time spent on the finished screen counts as paused.
            pause_start: Some(closed.ended_at),
            total_paused_ms: closed.paused_ms,
            linked_backlog_task_id: closed.backlog_task_id,
        };
        log_info!("Extending '{}' by {}s", self.config.task_name, seconds);

        self.persist_general();
        if history_changed {
            self.ctx.hooks.on_history_changed();
        }
        if backlog_changed {
            self.ctx.hooks.on_backlog_changed();
        }
        self.start();
        Ok(())
    }

    /// Completes an in-progress session early; otherwise restores the full
    /// countdown and clears any finished state.
    pub fn reset(&mut self) -> Option<HistoryEntry> {
        if self.runtime.is_in_progress() {
            return self.finish_early().ok();
        }
        let linked = self.runtime.linked_backlog_task_id.take();
        self.return_to_idle(linked);
        None
    }

    /// Throws the current session away without logging it.
    pub fn discard(&mut self) {
        if self.runtime.is_in_progress() {
            log_info!("Discarding session for '{}'", self.config.task_name);
        }
        self.return_to_idle(None);
        self.clear_runtime_snapshot();
    }

    pub fn add_backlog_task(&mut self, name: &str, minutes: u32) -> Result<BacklogTask> {
        let task = self.backlog.add(name, minutes)?;
        self.persist_general();
        self.ctx.hooks.on_backlog_changed();
        Ok(task)
    }

    pub fn delete_backlog_task(&mut self, id: &str) -> bool {
        if self.backlog.remove(id).is_none() {
            return false;
        }
        if self.runtime.linked_backlog_task_id.as_deref() == Some(id) {
            self.runtime.linked_backlog_task_id = None;
            if self.runtime.is_in_progress() {
                self.persist_runtime();
            }
        }
        self.persist_general();
        self.ctx.hooks.on_backlog_changed();
        true
    }

    /// Seeds the next session from a backlog task. An in-progress session is
    /// only replaced (silently, not logged) once the caller confirms.
    pub fn select_backlog_task(&mut self, id: &str, confirm_discard: bool) -> Result<BacklogSelection> {
        let task = self
            .backlog
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown backlog task {id}"))?;

        if self.runtime.is_in_progress() {
            if !confirm_discard {
                return Ok(BacklogSelection::NeedsConfirmation);
            }
            self.discard();
        }

        self.config = SessionConfig {
            total_duration_secs: DurationInput::Minutes(i64::from(task.minutes)).to_seconds(),
            task_name: task.name.clone(),
        };
        self.return_to_idle(Some(task.id.clone()));
        log_info!("Selected backlog task '{}' ({} min)", task.name, task.minutes);
        self.persist_general();
        Ok(BacklogSelection::Selected(self.config.clone()))
    }

    pub fn delete_history_entry(&mut self, id: i64) -> bool {
        if !self.ledger.delete(id) {
            return false;
        }
        self.persist_general();
        self.ctx.hooks.on_history_changed();
        true
    }

    pub fn clear_history(&mut self) {
        self.ledger.clear();
        self.persist_general();
        self.ctx.hooks.on_history_changed();
    }

    /// Countdown reached zero: log at the anchor, hold in Finished and fire
    /// the completion signal once.
    fn complete_naturally(&mut self, now: DateTime<Utc>) -> Option<HistoryEntry> {
        let ended_at = self
            .runtime
            .target_end
            .map(|target_end| target_end.min(now))
            .unwrap_or(now);
        let closed = self.runtime.close(ended_at)?;

        let (entry, backlog_slot) = self.log_closed(&closed, now);
        self.provisional = Some(ProvisionalFinish {
            entry_id: entry.id,
            closed,
            backlog_slot,
        });
        self.runtime.status = TimerStatus::Finished;
        self.runtime.remaining_secs = 0;
        self.clear_runtime_snapshot();

        log_info!("Timer finished for '{}'", entry.task_name);
        self.ctx.signal.notify_completion(&entry.task_name);
        Some(entry)
    }

    /// Records a closed session and drops its backlog task, handing back the
    /// slot the task occupied.
    fn log_closed(
        &mut self,
        closed: &ClosedSession,
        now: DateTime<Utc>,
    ) -> (HistoryEntry, Option<(usize, BacklogTask)>) {
        let entry = self.ledger.record(
            &self.config.task_name,
            closed.started_at,
            closed.ended_at,
            closed.paused_ms,
            now,
        );

        let backlog_slot = closed
            .backlog_task_id
            .as_deref()
            .and_then(|id| self.backlog.take(id));

        self.persist_general();
        self.ctx.hooks.on_history_changed();
        if backlog_slot.is_some() {
            self.ctx.hooks.on_backlog_changed();
        }
        (entry, backlog_slot)
    }

    fn return_to_idle(&mut self, linked_backlog_task_id: Option<String>) {
        self.provisional = None;
        self.runtime = SessionRuntime {
            linked_backlog_task_id,
            ..SessionRuntime::idle(self.config.total_duration_secs)
        };
    }

    fn persist_runtime(&self) {
        let document = self.runtime.to_document(&self.config);
        if let Err(err) = save_document(self.ctx.store.as_ref(), TIMER_STATE_KEY, &document) {
            log_warn!("Failed to persist timer snapshot: {err:#}");
        }
    }

    fn clear_runtime_snapshot(&self) {
        if let Err(err) = self.ctx.store.remove(TIMER_STATE_KEY) {
            log_warn!("Failed to clear timer snapshot: {err:#}");
        }
    }

    fn persist_general(&self) {
        let document = GeneralState {
            task_name: self.config.task_name.clone(),
            work_history: self.ledger.entries().to_vec(),
            task_backlog: self.backlog.tasks().to_vec(),
        };
        if let Err(err) = save_document(self.ctx.store.as_ref(), GENERAL_STATE_KEY, &document) {
            log_warn!("Failed to persist general state: {err:#}");
        }
    }
}
