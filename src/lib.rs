pub mod backlog;
pub mod clock;
pub mod format;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod settings;
pub mod storage;
pub mod timer;
pub mod utils;

#[cfg(test)]
mod testing;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use log::info;

use clock::SystemClock;
use notify::{CompletionSignal, LogSignal, RenderHooks};
use settings::SettingsStore;
use storage::{Database, KeyValueStore};
use timer::{Session, SessionContext, TimerController};

/// Installs the `env_logger` backend. Reads `RUST_LOG`, defaults to info,
/// and drops to debug when `FOCUSDIAL_DEBUG` is set. Safe to call twice.
pub fn init_logging() {
    let level = if utils::logging::debug_requested() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

/// Everything a host needs after startup.
pub struct App {
    pub settings: SettingsStore,
    pub db: Database,
    pub timer: TimerController,
}

/// Opens settings and storage, runs recovery, and hands back a controller
/// whose ticker is already re-anchored if a countdown survived the restart.
/// Must be called inside a tokio runtime.
pub async fn launch(settings_path: PathBuf, hooks: Arc<dyn RenderHooks>) -> Result<App> {
    info!("focusdial starting up...");

    let settings = SettingsStore::new(settings_path)?;
    let config = settings.get()?;
    let db = Database::open(settings.database_path()?)?;

    let store: Arc<dyn KeyValueStore> = Arc::new(db.clone());
    let ctx = SessionContext {
        store,
        clock: Arc::new(SystemClock),
        signal: completion_signal(&config.chime),
        hooks,
    };

    let session = Session::restore(ctx, config.default_session());
    let timer = TimerController::new(session, config.tick_interval());
    timer.resume_after_recovery().await;

    Ok(App {
        settings,
        db,
        timer,
    })
}

#[cfg(feature = "chime")]
fn completion_signal(chime: &settings::ChimeSettings) -> Arc<dyn CompletionSignal> {
    if chime.enabled {
        Arc::new(notify::ChimePlayer::new(chime.frequency_hz, chime.volume))
    } else {
        Arc::new(LogSignal)
    }
}

#[cfg(not(feature = "chime"))]
fn completion_signal(_chime: &settings::ChimeSettings) -> Arc<dyn CompletionSignal> {
    Arc::new(LogSignal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::NoopHooks;
    use timer::{DurationInput, TimerStatus};

    #[tokio::test]
    async fn launch_recovers_a_paused_session_from_disk() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let mut settings = settings::TimerSettings::default();
        settings.database_path = Some(dir.path().join("state.sqlite3"));
        SettingsStore::new(settings_path.clone())
            .unwrap()
            .update(settings)
            .unwrap();

        {
            let app = launch(settings_path.clone(), Arc::new(NoopHooks)).await.unwrap();
            assert_eq!(app.timer.status().await, TimerStatus::Idle);
            app.timer
                .configure(DurationInput::Minutes(15), "Review PR")
                .await
                .unwrap();
            app.timer.start().await;
            app.timer.pause().await.unwrap();
        }

        let app = launch(settings_path, Arc::new(NoopHooks)).await.unwrap();
        let view = app.timer.view().await;
        assert_eq!(view.status, TimerStatus::Paused);
        assert_eq!(view.task_name, "Review PR");
        assert!(!app.timer.is_ticking().await);
    }
}
