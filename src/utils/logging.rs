//! Module-gated logging macros.
//!
//! A module opts in by declaring its own switch and importing the macros
//! from the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("timer started for {}", task);
//! ```
//! With the switch off the calls compile to nothing observable, which keeps
//! the tick path quiet without touching the global `RUST_LOG` filter.

/// `log::debug!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::error!` behind the calling module's `ENABLE_LOGS` switch.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Log level requested through `FOCUSDIAL_DEBUG` (`1` or `true`).
pub fn debug_requested() -> bool {
    std::env::var("FOCUSDIAL_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
