pub mod backlog;
pub mod documents;
pub mod history;

pub use backlog::BacklogTask;
pub use documents::{GeneralState, TimerDocument, GENERAL_STATE_KEY, TIMER_STATE_KEY};
pub use history::{display_task_name, HistoryEntry, UNNAMED_TASK};
