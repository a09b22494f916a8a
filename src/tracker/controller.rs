use std::{collections::HashSet, sync::Arc};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    history::DailyHistory,
    models::{BreakRecord, DailyRecord, Notification, SessionState, WorkDuration},
    settings::TrackerSettings,
    store::KeyValueStore,
};

use super::{
    accrual::{accrue, efficiency},
    debounce::SaveDebouncer,
    notifications,
    state::{Phase, TrackerState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// Point-in-time view of the tracker, recomputed from raw timestamps.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub phase: Phase,
    pub session_id: Option<String>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub worked: WorkDuration,
    pub current_break: WorkDuration,
    pub total_break: WorkDuration,
    pub efficiency: u8,
    pub break_history: Vec<BreakRecord>,
    pub notifications: Vec<Notification>,
    pub computed_at: DateTime<Utc>,
}

impl TrackerSnapshot {
    pub fn capture(session: &SessionState, now: DateTime<Utc>) -> Self {
        let phase = session.phase();
        let accrual = accrue(session, now);
        Self {
            phase,
            session_id: session.session_id.clone(),
            check_in_time: session.check_in_time,
            worked: accrual.worked,
            current_break: accrual.current_break,
            total_break: accrual.total_break,
            efficiency: efficiency(
                accrual.worked.total_minutes(),
                accrual.total_break.total_minutes(),
            ),
            break_history: session.break_history.clone(),
            notifications: notifications::evaluate(&accrual, phase, now),
            computed_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TrackerEvent {
    StateChanged(TrackerSnapshot),
    Tick(TrackerSnapshot),
    Notification(Notification),
    DayCompleted(DailyRecord),
}

/// Owns the check-in session: transitions, the one-second ticker, debounced
/// persistence and archiving of completed days.
///
/// Lifecycle is `start -> transitions/ticks -> dispose`. After [`dispose`]
/// every transition fails and no timer remains.
///
/// [`dispose`]: TimeAccrualEngine::dispose
pub struct TimeAccrualEngine<S: KeyValueStore, C: Clock> {
    state: Arc<Mutex<TrackerState>>,
    store: Arc<S>,
    clock: Arc<C>,
    settings: TrackerSettings,
    ticker: Arc<Mutex<TickerSlot>>,
    saver: Arc<SaveDebouncer>,
    events: broadcast::Sender<TrackerEvent>,
    snapshots: Arc<watch::Sender<TrackerSnapshot>>,
}

impl<S: KeyValueStore, C: Clock> Clone for TimeAccrualEngine<S, C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
            settings: self.settings.clone(),
            ticker: self.ticker.clone(),
            saver: self.saver.clone(),
            events: self.events.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

/// Owns the ticker task; the task is aborted when the slot is dropped, so the
/// last engine clone going away stops the timer even without `dispose`.
#[derive(Default)]
struct TickerSlot(Option<JoinHandle<()>>);

impl TickerSlot {
    fn replace(&mut self, handle: JoinHandle<()>) {
        self.abort();
        self.0 = Some(handle);
    }

    fn abort(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl Drop for TickerSlot {
    fn drop(&mut self) {
        self.abort();
    }
}

fn ensure_live(state: &TrackerState) -> Result<()> {
    if state.disposed {
        bail!("time tracker has been disposed");
    }
    Ok(())
}

impl<S: KeyValueStore, C: Clock> TimeAccrualEngine<S, C> {
    /// Restores the persisted session once and resumes ticking if it was
    /// checked in. Unreadable state is logged and treated as absent.
    pub async fn start(store: S, clock: C, settings: TrackerSettings) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(clock);
        let now = clock.now();

        let session = match store.load_session_state().await {
            Ok(Some(saved)) => saved.normalized(),
            Ok(None) => SessionState::default(),
            Err(err) => {
                log_warn!("ignoring unreadable session state: {err:#}");
                SessionState::default()
            }
        };

        let resume = session.is_checked_in;
        if resume {
            log_info!(
                "restored session {} ({})",
                session.session_id.as_deref().unwrap_or("unknown"),
                session.phase().as_str()
            );
        }

        let initial = TrackerSnapshot::capture(&session, now);
        let state = Arc::new(Mutex::new(TrackerState::restored(session, now)));
        let saver = SaveDebouncer::spawn(state.clone(), store.clone(), settings.save_debounce());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshots, _) = watch::channel(initial);

        let engine = Self {
            state,
            store,
            clock,
            settings,
            ticker: Arc::new(Mutex::new(TickerSlot::default())),
            saver: Arc::new(saver),
            events,
            snapshots: Arc::new(snapshots),
        };

        if resume {
            engine.spawn_ticker().await;
        }

        engine
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Receiver for the latest published snapshot (transitions and ticks).
    pub fn watch(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let guard = self.state.lock().await;
        TrackerSnapshot::capture(&guard.session, self.clock.now())
    }

    pub async fn session_state(&self) -> SessionState {
        self.state.lock().await.session.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.session.phase()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.snapshot().await.notifications
    }

    pub async fn check_in(&self) -> Result<TrackerSnapshot> {
        let now = self.clock.now();
        let snapshot = {
            let mut guard = self.state.lock().await;
            ensure_live(&guard)?;
            let session_id = Uuid::new_v4().to_string();
            guard.session.check_in(session_id.clone(), now)?;
            guard.last_tick_at = Some(now);
            self.saver.mark_dirty();
            log_info!("checked in, session {session_id}");
            TrackerSnapshot::capture(&guard.session, now)
        };

        self.spawn_ticker().await;
        self.publish_state(snapshot.clone());
        self.notify(notifications::welcome(now));
        Ok(snapshot)
    }

    pub async fn start_break(&self) -> Result<TrackerSnapshot> {
        let now = self.clock.now();
        let snapshot = {
            let mut guard = self.state.lock().await;
            ensure_live(&guard)?;
            guard.session.start_break(now)?;
            self.saver.mark_dirty();
            log_info!("break started at {}", now.format("%H:%M:%S"));
            TrackerSnapshot::capture(&guard.session, now)
        };

        self.publish_state(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn end_break(&self) -> Result<BreakRecord> {
        let now = self.clock.now();
        let (closed, snapshot) = {
            let mut guard = self.state.lock().await;
            ensure_live(&guard)?;
            let closed = guard.session.end_break(now)?;
            self.saver.mark_dirty();
            log_info!("break ended after {}", closed.duration);
            (closed, TrackerSnapshot::capture(&guard.session, now))
        };

        self.publish_state(snapshot);
        self.notify(notifications::break_ended(closed.duration, now));
        Ok(closed)
    }

    /// Ends a running break, archives the day and resets the session.
    pub async fn check_out(&self) -> Result<DailyRecord> {
        let now = self.clock.now();
        let (ended_break, record, snapshot) = {
            let mut guard = self.state.lock().await;
            ensure_live(&guard)?;
            if !guard.session.is_checked_in {
                bail!("not checked in");
            }
            let ended_break = if guard.session.is_on_break {
                Some(guard.session.end_break(now)?)
            } else {
                None
            };
            let record = guard.session.check_out(now)?;
            guard.last_tick_at = None;
            self.saver.mark_dirty();
            (ended_break, record, TrackerSnapshot::capture(&guard.session, now))
        };

        self.cancel_ticker().await;

        if let Some(closed) = ended_break {
            self.notify(notifications::break_ended(closed.duration, now));
        }

        if let Err(err) = self.store.append_daily_record(record.clone()).await {
            log_error!("failed to archive daily record for {}: {err:#}", record.date);
        }

        log_info!(
            "checked out: worked {}, breaks {}, efficiency {}%",
            record.total_work_time,
            record.total_break_time,
            record.efficiency
        );

        self.publish_state(snapshot);
        self.notify(notifications::day_summary(&record, now));
        let _ = self.events.send(TrackerEvent::DayCompleted(record.clone()));
        Ok(record)
    }

    /// Archived days, ordered by date.
    pub async fn history(&self) -> Result<DailyHistory> {
        let records = self.store.list_daily_records().await?;
        Ok(DailyHistory::new(records))
    }

    /// Forgets the session and the archive, e.g. when the user signs out.
    pub async fn logout(&self) -> Result<()> {
        let now = self.clock.now();
        let snapshot = {
            let mut guard = self.state.lock().await;
            ensure_live(&guard)?;
            guard.session = SessionState::default();
            guard.last_tick_at = None;
            TrackerSnapshot::capture(&guard.session, now)
        };

        self.cancel_ticker().await;
        self.saver.discard_then(self.store.clear()).await?;
        log_info!("tracker state cleared");
        self.publish_state(snapshot);
        Ok(())
    }

    /// Stops the ticker, flushes a pending save and rejects further transitions.
    pub async fn dispose(&self) -> Result<()> {
        {
            let mut guard = self.state.lock().await;
            if guard.disposed {
                return Ok(());
            }
            guard.disposed = true;
        }

        self.cancel_ticker().await;
        self.saver.shutdown().await?;
        log_info!("time tracker disposed");
        Ok(())
    }

    pub async fn is_disposed(&self) -> bool {
        self.state.lock().await.disposed
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;

        let state = self.state.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let snapshots = self.snapshots.clone();
        let tick_interval = self.settings.tick_interval();
        let due_after = chrono::Duration::from_std(tick_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(1));

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut active_reminders: HashSet<String> = HashSet::new();

            loop {
                interval.tick().await;

                // Always read the current state; nothing is captured from spawn time.
                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.disposed || !guard.session.is_checked_in {
                        break;
                    }
                    let now = clock.now();
                    if !guard.tick_due(now, due_after) {
                        continue;
                    }
                    guard.last_tick_at = Some(now);
                    TrackerSnapshot::capture(&guard.session, now)
                };

                let fired: HashSet<String> =
                    snapshot.notifications.iter().map(|n| n.id.clone()).collect();
                for notification in &snapshot.notifications {
                    if !active_reminders.contains(&notification.id) {
                        let _ = events.send(TrackerEvent::Notification(notification.clone()));
                    }
                }
                active_reminders = fired;

                snapshots.send_replace(snapshot.clone());
                let _ = events.send(TrackerEvent::Tick(snapshot));
            }

            log_debug!("ticker stopped");
        });

        ticker_guard.replace(handle);
    }

    async fn cancel_ticker(&self) {
        self.ticker.lock().await.abort();
    }

    fn publish_state(&self, snapshot: TrackerSnapshot) {
        self.snapshots.send_replace(snapshot.clone());
        let _ = self.events.send(TrackerEvent::StateChanged(snapshot));
    }

    fn notify(&self, notification: Notification) {
        log_debug!("[{}] {}", notification.kind.as_str(), notification.message);
        let _ = self.events.send(TrackerEvent::Notification(notification));
    }
}
