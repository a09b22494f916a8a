//! Engine behaviour over the in-memory store with a paused tokio clock.

mod common;

use std::time::Duration as StdDuration;

use chrono::Duration;
use common::{at, fresh, start_engine};
use timeaccrual::{
    KeyValueStore, MemoryStore, MockClock, Phase, SessionState, TrackerEvent,
};

async fn idle(ms: u64) {
    tokio::time::sleep(StdDuration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn full_day_produces_daily_record() {
    let (engine, store, clock) = fresh().await;
    let mut events = engine.subscribe();

    engine.check_in().await.unwrap();
    clock.set(at(11, 0));
    engine.start_break().await.unwrap();
    clock.set(at(11, 15));
    engine.end_break().await.unwrap();
    clock.set(at(17, 0));
    let record = engine.check_out().await.unwrap();

    assert_eq!(record.total_break_time.to_string(), "00:15:00");
    assert_eq!(record.total_work_time.to_string(), "07:45:00");
    assert_eq!(record.efficiency, 97);
    assert_eq!(record.date, at(9, 0).date_naive());

    assert_eq!(engine.phase().await, Phase::CheckedOut);
    assert_eq!(engine.session_state().await, SessionState::default());

    let history = engine.history().await.unwrap();
    assert_eq!(history.records(), &[record.clone()]);
    assert_eq!(store.list_daily_records().await.unwrap(), vec![record.clone()]);

    let mut completed = None;
    let mut summary_seen = false;
    while let Ok(event) = events.try_recv() {
        match event {
            TrackerEvent::DayCompleted(day) => completed = Some(day),
            TrackerEvent::Notification(n) if n.id == "day-summary" => summary_seen = true,
            _ => {}
        }
    }
    assert_eq!(completed, Some(record));
    assert!(summary_seen);

    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn checkout_while_on_break_ends_break_first() {
    let (engine, _store, clock) = fresh().await;

    engine.check_in().await.unwrap();
    clock.set(at(12, 0));
    engine.start_break().await.unwrap();
    clock.set(at(12, 40));
    let record = engine.check_out().await.unwrap();

    assert_eq!(record.total_break_time.to_string(), "00:40:00");
    assert_eq!(record.total_work_time.to_string(), "03:00:00");
    assert_eq!(record.breaks.len(), 1);
    assert!(record.breaks[0].end_time.is_some());
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rapid_mutations_coalesce_into_one_write() {
    let (engine, store, clock) = fresh().await;

    engine.check_in().await.unwrap();
    idle(100).await;
    clock.advance(Duration::minutes(1));
    engine.start_break().await.unwrap();
    idle(100).await;
    clock.advance(Duration::minutes(1));
    engine.end_break().await.unwrap();
    assert_eq!(store.save_count(), 0);

    idle(3_000).await;

    assert_eq!(store.save_count(), 1);
    let saved = store.load_session_state().await.unwrap().unwrap();
    assert_eq!(saved, engine.session_state().await);
    assert_eq!(saved.break_history.len(), 1);
    assert!(!saved.is_on_break);
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dispose_flushes_pending_save() {
    let (engine, store, _clock) = fresh().await;

    engine.check_in().await.unwrap();
    engine.dispose().await.unwrap();

    assert_eq!(store.save_count(), 1);
    let saved = store.load_session_state().await.unwrap().unwrap();
    assert!(saved.is_checked_in);

    assert!(engine.start_break().await.is_err());
    idle(5_000).await;
    assert_eq!(store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn persisted_session_round_trips_into_new_engine() {
    let (engine, store, clock) = fresh().await;

    engine.check_in().await.unwrap();
    clock.set(at(10, 30));
    engine.start_break().await.unwrap();
    let before = engine.session_state().await;
    engine.dispose().await.unwrap();

    clock.set(at(10, 45));
    let restored = start_engine(&store, &clock).await;
    assert_eq!(restored.session_state().await, before);
    assert_eq!(restored.phase().await, Phase::OnBreak);

    let snapshot = restored.snapshot().await;
    assert_eq!(snapshot.worked.to_string(), "01:30:00");
    assert_eq!(snapshot.current_break.to_string(), "00:15:00");

    let closed = restored.end_break().await.unwrap();
    assert_eq!(closed.start_time, at(10, 30));
    assert_eq!(closed.duration.to_string(), "00:15:00");
    restored.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restored_session_resumes_ticking() {
    let store = MemoryStore::new();
    let clock = MockClock::new(at(9, 0));
    let mut seed = SessionState::new();
    seed.check_in("seeded".into(), at(9, 0)).unwrap();
    store.save_session_state(seed).await.unwrap();

    clock.set(at(10, 0));
    let engine = start_engine(&store, &clock).await;
    let rx = engine.watch();

    clock.advance(Duration::seconds(2));
    idle(1_500).await;

    let latest = rx.borrow().clone();
    assert_eq!(latest.phase, Phase::Working);
    assert_eq!(latest.session_id.as_deref(), Some("seeded"));
    assert_eq!(latest.worked.to_string(), "01:00:02");
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticks_without_clock_progress_publish_nothing() {
    let (engine, _store, clock) = fresh().await;
    engine.check_in().await.unwrap();
    let mut rx = engine.watch();
    rx.borrow_and_update();

    idle(3_500).await;
    assert!(!rx.has_changed().unwrap());

    clock.advance(Duration::seconds(1));
    idle(1_000).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().worked.to_string(), "00:00:01");
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reminders_are_announced_once_per_appearance() {
    let (engine, _store, clock) = fresh().await;
    let mut events = engine.subscribe();
    engine.check_in().await.unwrap();

    clock.set(at(11, 5));
    idle(1_500).await;
    clock.advance(Duration::seconds(2));
    idle(2_000).await;

    let mut reminder_events = 0;
    let mut last_tick = None;
    while let Ok(event) = events.try_recv() {
        match event {
            TrackerEvent::Notification(n) if n.id == "break-reminder" => reminder_events += 1,
            TrackerEvent::Tick(snapshot) => last_tick = Some(snapshot),
            _ => {}
        }
    }
    assert_eq!(reminder_events, 1);

    let ids: Vec<String> = last_tick
        .unwrap()
        .notifications
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec!["hydration-reminder", "break-reminder"]);
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn malformed_blob_starts_checked_out() {
    let store = MemoryStore::new();
    store.put_raw_session("{ this is not json").await;
    let clock = MockClock::new(at(9, 0));

    let engine = start_engine(&store, &clock).await;
    assert_eq!(engine.phase().await, Phase::CheckedOut);
    engine.check_in().await.unwrap();
    assert_eq!(engine.phase().await, Phase::Working);
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn partial_blob_is_tolerated() {
    let store = MemoryStore::new();
    store
        .put_raw_session(r#"{ "isCheckedIn": true, "checkInTime": "2024-09-02T08:00:00Z" }"#)
        .await;
    let clock = MockClock::new(at(9, 0));

    let engine = start_engine(&store, &clock).await;
    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Working);
    assert_eq!(snapshot.worked.to_string(), "01:00:00");
    assert!(snapshot.break_history.is_empty());
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_writes_do_not_block_transitions() {
    let (engine, store, clock) = fresh().await;
    store.set_fail_writes(true);

    engine.check_in().await.unwrap();
    idle(2_000).await;
    assert_eq!(store.save_count(), 0);
    assert_eq!(engine.phase().await, Phase::Working);

    store.set_fail_writes(false);
    clock.advance(Duration::minutes(5));
    engine.start_break().await.unwrap();
    idle(2_000).await;
    assert_eq!(store.save_count(), 1);
    assert!(store.load_session_state().await.unwrap().unwrap().is_on_break);
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn logout_clears_store_and_state() {
    let (engine, store, clock) = fresh().await;
    engine.check_in().await.unwrap();
    clock.set(at(12, 0));
    engine.check_out().await.unwrap();
    engine.check_in().await.unwrap();

    engine.logout().await.unwrap();
    idle(2_000).await;

    assert_eq!(engine.phase().await, Phase::CheckedOut);
    assert!(store.list_daily_records().await.unwrap().is_empty());
    assert!(store.load_session_state().await.unwrap().is_none());
    engine.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn logout_waits_for_in_flight_save() {
    let (engine, store, _clock) = fresh().await;
    store.set_write_delay(StdDuration::from_millis(500));

    engine.check_in().await.unwrap();
    // Debounce elapsed; the checked-in blob is now mid-write.
    idle(1_100).await;

    engine.logout().await.unwrap();
    idle(1_000).await;

    assert_eq!(store.save_count(), 1);
    assert!(store.load_session_state().await.unwrap().is_none());
    engine.dispose().await.unwrap();
    assert!(store.load_session_state().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_engine_stops_ticker() {
    let (engine, _store, clock) = fresh().await;
    engine.check_in().await.unwrap();
    let mut rx = engine.watch();
    rx.borrow_and_update();

    drop(engine);
    clock.advance(Duration::seconds(5));
    idle(2_000).await;

    assert!(rx.has_changed().is_err());
}
