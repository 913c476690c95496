//! Side-effect seams the session calls into. Implementations are
//! fire-and-forget: they return nothing and must not block the caller.

#[cfg(feature = "chime")]
pub mod chime;

#[cfg(feature = "chime")]
pub use chime::ChimePlayer;

use log::info;

/// Emitted exactly once per natural finish.
pub trait CompletionSignal: Send + Sync {
    fn notify_completion(&self, task_name: &str);
}

/// Advisory re-render triggers for list views.
pub trait RenderHooks: Send + Sync {
    fn on_history_changed(&self) {}
    fn on_backlog_changed(&self) {}
}

/// Default signal when no audio output is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSignal;

impl CompletionSignal for LogSignal {
    fn notify_completion(&self, task_name: &str) {
        info!("Timer finished: {task_name}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl RenderHooks for NoopHooks {}
