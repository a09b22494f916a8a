use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::store::KeyValueStore;

use super::state::TrackerState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Coalesces bursts of session mutations into a single write.
///
/// Every [`mark_dirty`](Self::mark_dirty) restarts the quiet period; the latest
/// session is written once the period elapses with no further mutation. On
/// shutdown a pending write is flushed before the worker exits.
pub struct SaveDebouncer {
    dirty: Arc<AtomicBool>,
    wake: Arc<Notify>,
    // Held for the whole snapshot-and-write so a clear cannot interleave.
    write_gate: Arc<Mutex<()>>,
    cancel_token: CancellationToken,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl SaveDebouncer {
    pub fn spawn<S: KeyValueStore>(
        state: Arc<Mutex<TrackerState>>,
        store: Arc<S>,
        quiet_period: Duration,
    ) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let write_gate = Arc::new(Mutex::new(()));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(save_loop(
            state,
            store,
            quiet_period,
            dirty.clone(),
            wake.clone(),
            write_gate.clone(),
            cancel_token.clone(),
        ));

        Self {
            dirty,
            wake,
            write_gate,
            cancel_token,
            handle: StdMutex::new(Some(handle)),
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Drops any pending write, waits out a write already in flight, then
    /// runs `clear` before the worker can write again.
    pub async fn discard_then<F: Future>(&self, clear: F) -> F::Output {
        let _gate = self.write_gate.lock().await;
        self.dirty.store(false, Ordering::SeqCst);
        clear.await
    }

    /// Stops the worker, flushing a pending write first.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel_token.cancel();
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.await.context("save worker failed to join")?;
        }
        Ok(())
    }
}

impl Drop for SaveDebouncer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn save_loop<S: KeyValueStore>(
    state: Arc<Mutex<TrackerState>>,
    store: Arc<S>,
    quiet_period: Duration,
    dirty: Arc<AtomicBool>,
    wake: Arc<Notify>,
    write_gate: Arc<Mutex<()>>,
    cancel_token: CancellationToken,
) {
    'outer: loop {
        tokio::select! {
            _ = wake.notified() => {}
            _ = cancel_token.cancelled() => break 'outer,
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(quiet_period) => {
                    write_if_dirty(&state, store.as_ref(), &dirty, &write_gate).await;
                    break;
                }
                _ = wake.notified() => continue,
                _ = cancel_token.cancelled() => break 'outer,
            }
        }
    }

    write_if_dirty(&state, store.as_ref(), &dirty, &write_gate).await;
    log_debug!("save worker stopped");
}

async fn write_if_dirty<S: KeyValueStore>(
    state: &Mutex<TrackerState>,
    store: &S,
    dirty: &AtomicBool,
    write_gate: &Mutex<()>,
) {
    let _gate = write_gate.lock().await;
    if !dirty.swap(false, Ordering::SeqCst) {
        return;
    }

    let snapshot = state.lock().await.session.clone();
    match store.save_session_state(snapshot).await {
        Ok(()) => log_debug!("session state saved"),
        // Not retried here; the next mutation schedules another write.
        Err(err) => log_warn!("failed to save session state: {err:#}"),
    }
}
