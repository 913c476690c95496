use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::timer::{DurationInput, SessionConfig};

const DATABASE_FILE_NAME: &str = "focusdial.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChimeSettings {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub volume: f32,
}

impl Default for ChimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency_hz: 800.0,
            volume: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    pub default_minutes: u32,
    pub presets: Vec<u32>,
    pub tick_interval_ms: u64,
    pub database_path: Option<PathBuf>,
    pub chime: ChimeSettings,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            default_minutes: 25,
            presets: vec![5, 15, 25, 45, 60],
            tick_interval_ms: 1000,
            database_path: None,
            chime: ChimeSettings::default(),
        }
    }
}

impl TimerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn default_session(&self) -> SessionConfig {
        SessionConfig {
            total_duration_secs: DurationInput::Minutes(i64::from(self.default_minutes)).to_seconds(),
            task_name: String::new(),
        }
    }
}

/// Settings file plus environment overrides. A missing or unreadable file
/// yields defaults; updates are written back immediately.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TimerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                TimerSettings::default()
            })
        } else {
            TimerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<TimerSettings> {
        self.data
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    pub fn update(&self, settings: TimerSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings;
        self.persist(&guard)
    }

    /// `FOCUSDIAL_DB`, then the configured path, then a file next to the
    /// settings.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FOCUSDIAL_DB") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        if let Some(path) = self.get()?.database_path {
            return Ok(path);
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(DATABASE_FILE_NAME))
    }

    fn persist(&self, data: &TimerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.get().unwrap();

        assert_eq!(settings, TimerSettings::default());
        assert_eq!(settings.default_session().total_duration_secs, 1500);
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn updates_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.get().unwrap();
        settings.default_minutes = 50;
        settings.chime.enabled = false;
        store.update(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.get().unwrap(), settings);
    }

    #[test]
    fn malformed_or_partial_files_fall_back_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ nope").unwrap();
        assert_eq!(
            SettingsStore::new(broken).unwrap().get().unwrap(),
            TimerSettings::default()
        );

        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{"defaultMinutes": 90, "tickIntervalMs": 0}"#).unwrap();
        let settings = SettingsStore::new(partial).unwrap().get().unwrap();
        assert_eq!(settings.presets, TimerSettings::default().presets);
        assert_eq!(settings.default_session().total_duration_secs, 3600);
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn configured_database_path_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        if std::env::var("FOCUSDIAL_DB").is_ok() {
            return;
        }
        assert_eq!(store.database_path().unwrap(), dir.path().join(DATABASE_FILE_NAME));

        let mut settings = store.get().unwrap();
        settings.database_path = Some(dir.path().join("custom.sqlite3"));
        store.update(settings).unwrap();
        assert_eq!(store.database_path().unwrap(), dir.path().join("custom.sqlite3"));
    }
}
