use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

const TICK_ENV: &str = "TIMEACCRUAL_TICK_MS";
const DEBOUNCE_ENV: &str = "TIMEACCRUAL_SAVE_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Nominal tick cadence for recomputing durations.
    pub tick_interval_ms: u64,
    /// Quiet period before a burst of session changes is written.
    pub save_debounce_ms: u64,
    pub database_file: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            save_debounce_ms: 1000,
            database_file: "timeaccrual.sqlite3".into(),
        }
    }
}

impl TrackerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Applies `TIMEACCRUAL_TICK_MS` / `TIMEACCRUAL_SAVE_DEBOUNCE_MS` when set
    /// to a valid integer; anything else is ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = read_env_ms(TICK_ENV) {
            self.tick_interval_ms = value;
        }
        if let Some(value) = read_env_ms(DEBOUNCE_ENV) {
            self.save_debounce_ms = value;
        }
        self
    }
}

fn read_env_ms(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// JSON-file backed settings. A missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_tracker(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.tracker(), TrackerSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let custom = TrackerSettings {
            tick_interval_ms: 250,
            ..TrackerSettings::default()
        };
        store.update_tracker(custom.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.tracker(), custom);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.tracker().save_debounce_ms, 1000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "saveDebounceMs": 300 }"#).unwrap();
        let settings = SettingsStore::new(path).unwrap().tracker();
        assert_eq!(settings.save_debounce_ms, 300);
        assert_eq!(settings.tick_interval_ms, 1000);
    }
}
