#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use timeaccrual::{MemoryStore, MockClock, TimeAccrualEngine, TrackerSettings};

pub type TestEngine = TimeAccrualEngine<MemoryStore, MockClock>;

/// Wall-clock instant on the fixed test day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

pub async fn start_engine(store: &MemoryStore, clock: &MockClock) -> TestEngine {
    TimeAccrualEngine::start(store.clone(), clock.clone(), TrackerSettings::default()).await
}

/// Fresh store and clock set to 09:00, plus an engine over them.
pub async fn fresh() -> (TestEngine, MemoryStore, MockClock) {
    let store = MemoryStore::new();
    let clock = MockClock::new(at(9, 0));
    let engine = start_engine(&store, &clock).await;
    (engine, store, clock)
}
