use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{SessionState, WorkDuration};

/// Durations derived from a session at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accrual {
    pub worked: WorkDuration,
    pub current_break: WorkDuration,
    pub total_break: WorkDuration,
}

fn span_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().max(0)
}

/// Milliseconds spent in the break that is still running, zero otherwise.
pub fn open_break_ms(session: &SessionState, now: DateTime<Utc>) -> i64 {
    match (session.is_on_break, session.last_break_time) {
        (true, Some(started)) => span_ms(started, now),
        _ => 0,
    }
}

/// Worked time in milliseconds: gross session time minus closed and open breaks.
///
/// Recomputed from raw timestamps on every call. Each span clamps at zero so a
/// clock stepping backwards never yields negative time.
pub fn worked_ms(session: &SessionState, now: DateTime<Utc>) -> i64 {
    let Some(check_in) = session.check_in_time else {
        return 0;
    };

    let gross = span_ms(check_in, now);
    let closed = session.closed_break_ms();
    let open = open_break_ms(session, now);

    (gross - closed - open).max(0)
}

pub fn accrue(session: &SessionState, now: DateTime<Utc>) -> Accrual {
    let open = open_break_ms(session, now);
    Accrual {
        worked: WorkDuration::from_millis(worked_ms(session, now)),
        current_break: WorkDuration::from_millis(open),
        total_break: WorkDuration::from_millis(session.closed_break_ms() + open),
    }
}

/// Share of worked minutes in worked plus break minutes, as a rounded percentage.
pub fn efficiency(work_minutes: u64, break_minutes: u64) -> u8 {
    let total = work_minutes + break_minutes;
    if total == 0 {
        return 100;
    }
    let ratio = work_minutes as f64 / total as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}
