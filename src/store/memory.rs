use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use crate::models::{DailyRecord, SessionState};

use super::KeyValueStore;

#[derive(Default)]
struct MemoryInner {
    session_json: Option<String>,
    history: Vec<DailyRecord>,
}

/// In-process store keeping the session blob as serialized JSON, the same
/// shape a browser's local storage would hold.
///
/// Counts session writes so callers can observe save coalescing, and can be
/// switched into a failing or slow mode to exercise error paths and writes
/// that are still in flight.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    saves: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    write_delay_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the raw blob, e.g. with a payload from an older build.
    pub async fn put_raw_session(&self, json: impl Into<String>) {
        self.inner.lock().await.session_json = Some(json.into());
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delays every session write by `delay` before it lands.
    pub fn set_write_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(ms, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory store is read-only");
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    async fn load_session_state(&self) -> Result<Option<SessionState>> {
        let guard = self.inner.lock().await;
        match guard.session_json.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn save_session_state(&self, state: SessionState) -> Result<()> {
        self.check_writable()?;
        let json = serde_json::to_string(&state)?;
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        self.inner.lock().await.session_json = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_daily_record(&self, record: DailyRecord) -> Result<()> {
        self.check_writable()?;
        self.inner.lock().await.history.push(record);
        Ok(())
    }

    async fn list_daily_records(&self) -> Result<Vec<DailyRecord>> {
        Ok(self.inner.lock().await.history.clone())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.session_json = None;
        guard.history.clear();
        Ok(())
    }
}
