//! Persistence collaborator used by the tracker.
//!
//! The live session lives in one blob; completed days go to a separate
//! append-only history. Writes are fire-and-forget from the tracker's point of
//! view: failures are logged and the in-memory state stays authoritative.

mod memory;

use std::future::Future;

use anyhow::Result;

use crate::models::{DailyRecord, SessionState};

pub use memory::MemoryStore;

pub trait KeyValueStore: Send + Sync + 'static {
    fn load_session_state(&self) -> impl Future<Output = Result<Option<SessionState>>> + Send;

    fn save_session_state(&self, state: SessionState) -> impl Future<Output = Result<()>> + Send;

    fn append_daily_record(&self, record: DailyRecord) -> impl Future<Output = Result<()>> + Send;

    /// Records in insertion order.
    fn list_daily_records(&self) -> impl Future<Output = Result<Vec<DailyRecord>>> + Send;

    /// Drops both the session blob and the history. Used on logout.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}
