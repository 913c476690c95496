pub mod controller;
pub mod recovery;
pub mod session;
pub mod state;

pub use controller::TimerController;
pub use recovery::{classify, Recovery};
pub use session::{BacklogSelection, Session, SessionContext, SessionView};
pub use state::{
    remaining_from_anchor, DurationInput, SessionConfig, SessionRuntime, TimerStatus,
    DEFAULT_DURATION_SECS, MAX_DURATION_SECS, MIN_DURATION_SECS,
};
