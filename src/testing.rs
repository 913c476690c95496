//! Shared fakes for unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    clock::ManualClock,
    notify::{CompletionSignal, RenderHooks},
    storage::{KeyValueStore, MemoryStore},
    timer::SessionContext,
};

#[derive(Debug, Default)]
pub struct RecordingSignal {
    pub completions: Mutex<Vec<String>>,
}

impl RecordingSignal {
    pub fn names(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

impl CompletionSignal for RecordingSignal {
    fn notify_completion(&self, task_name: &str) {
        self.completions.lock().unwrap().push(task_name.to_string());
    }
}

#[derive(Debug, Default)]
pub struct CountingHooks {
    pub history: AtomicUsize,
    pub backlog: AtomicUsize,
}

impl RenderHooks for CountingHooks {
    fn on_history_changed(&self) {
        self.history.fetch_add(1, Ordering::SeqCst);
    }

    fn on_backlog_changed(&self) {
        self.backlog.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory store whose writes can be switched off to simulate a full or
/// disabled storage area.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: AtomicBool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("quota exceeded");
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage disabled");
        }
        self.inner.remove(key)
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap()
}

/// Handles to every collaborator so tests can inspect them after the
/// session has taken its own clones.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<FlakyStore>,
    pub signal: Arc<RecordingSignal>,
    pub hooks: Arc<CountingHooks>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(epoch())),
            store: Arc::new(FlakyStore::default()),
            signal: Arc::new(RecordingSignal::default()),
            hooks: Arc::new(CountingHooks::default()),
        }
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            store: self.store.clone(),
            clock: self.clock.clone(),
            signal: self.signal.clone(),
            hooks: self.hooks.clone(),
        }
    }
}
