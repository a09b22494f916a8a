//! Work/break time accrual for a personal check-in widget.
//!
//! [`TimeAccrualEngine`] tracks check-in, breaks and check-out, recomputes
//! worked and break time from raw timestamps on a one-second tick, persists
//! the live session through a [`KeyValueStore`] and archives each finished day
//! as a [`DailyRecord`].

pub mod clock;
pub mod db;
pub mod history;
pub mod models;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod utils;

use std::path::Path;

use anyhow::{Context, Result};

pub use clock::{Clock, MockClock, SystemClock};
pub use db::Database;
pub use history::{DailyHistory, HistorySummary};
pub use models::{
    BreakRecord, DailyRecord, Notification, NotificationKind, SessionState, WorkDuration,
};
pub use settings::{SettingsStore, TrackerSettings};
pub use store::{KeyValueStore, MemoryStore};
pub use tracker::{Phase, TimeAccrualEngine, TrackerEvent, TrackerSnapshot};

const SETTINGS_FILE: &str = "settings.json";

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Opens settings and the SQLite store under `app_data_dir` and starts an
/// engine on the system clock, restoring any session left from a previous run.
pub async fn bootstrap(app_data_dir: &Path) -> Result<TimeAccrualEngine<Database, SystemClock>> {
    std::fs::create_dir_all(app_data_dir).with_context(|| {
        format!("failed to create app data directory {}", app_data_dir.display())
    })?;

    let settings_store = SettingsStore::new(app_data_dir.join(SETTINGS_FILE))?;
    let settings = settings_store.tracker().with_env_overrides();

    let database = Database::new(app_data_dir.join(&settings.database_file))?;
    log::info!("time tracker starting, data in {}", app_data_dir.display());

    Ok(TimeAccrualEngine::start(database, SystemClock, settings).await)
}
