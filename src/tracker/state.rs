use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BreakRecord, DailyRecord, SessionState, WorkDuration};

use super::accrual::{efficiency, worked_ms};

const CLOCK_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    CheckedOut,
    Working,
    OnBreak,
}

impl Phase {
    pub fn of(session: &SessionState) -> Self {
        match (session.is_checked_in, session.is_on_break) {
            (false, _) => Phase::CheckedOut,
            (true, false) => Phase::Working,
            (true, true) => Phase::OnBreak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CheckedOut => "CheckedOut",
            Phase::Working => "Working",
            Phase::OnBreak => "OnBreak",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::CheckedOut)
    }
}

/// Engine-side state wrapped around the persisted session.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    pub session: SessionState,
    /// Instant of the last tick that actually recomputed durations.
    pub last_tick_at: Option<DateTime<Utc>>,
    pub disposed: bool,
}

impl TrackerState {
    pub fn restored(session: SessionState, now: DateTime<Utc>) -> Self {
        let last_tick_at = session.is_checked_in.then_some(now);
        Self {
            session,
            last_tick_at,
            disposed: false,
        }
    }

    /// Drift guard: a tick only recomputes once a full interval has elapsed
    /// since the last processed tick. A clock that stepped backwards resyncs
    /// immediately instead of stalling until it catches up.
    pub fn tick_due(&self, now: DateTime<Utc>, interval: chrono::Duration) -> bool {
        match self.last_tick_at {
            Some(last) if now < last => true,
            Some(last) => now - last >= interval,
            None => true,
        }
    }
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        Phase::of(self)
    }

    /// `CheckedOut -> Working`. Starts a fresh session with empty break history.
    pub fn check_in(&mut self, session_id: String, now: DateTime<Utc>) -> Result<()> {
        if self.is_checked_in {
            bail!("already checked in");
        }

        *self = Self {
            session_id: Some(session_id),
            is_checked_in: true,
            check_in_time: Some(now),
            ..Self::default()
        };
        Ok(())
    }

    /// `Working -> OnBreak`. Opens a new break record.
    pub fn start_break(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.phase() {
            Phase::CheckedOut => bail!("not checked in"),
            Phase::OnBreak => bail!("already on break"),
            Phase::Working => {}
        }

        self.is_on_break = true;
        self.last_break_time = Some(now);
        self.break_history.push(BreakRecord::open(now));
        Ok(())
    }

    /// `OnBreak -> Working`. Closes the open record and returns a copy of it.
    pub fn end_break(&mut self, now: DateTime<Utc>) -> Result<BreakRecord> {
        match self.phase() {
            Phase::CheckedOut => bail!("not checked in"),
            Phase::Working => bail!("not on break"),
            Phase::OnBreak => {}
        }

        let started = self.last_break_time.unwrap_or(now);
        if self.open_break().is_none() {
            self.break_history.push(BreakRecord::open(started));
        }
        let closed = match self.open_break_mut() {
            Some(record) => {
                record.close(now);
                record.clone()
            }
            None => bail!("no open break record"),
        };

        self.is_on_break = false;
        self.last_break_time = None;
        self.total_break_time = WorkDuration::from_millis(self.closed_break_ms());
        Ok(closed)
    }

    /// `Working|OnBreak -> CheckedOut`. Ends any running break, folds the
    /// session into a [`DailyRecord`] and resets the state to empty.
    pub fn check_out(&mut self, now: DateTime<Utc>) -> Result<DailyRecord> {
        let Some(check_in) = self.check_in_time.filter(|_| self.is_checked_in) else {
            bail!("not checked in");
        };

        if self.is_on_break {
            self.end_break(now)?;
        }

        let total_work_time = WorkDuration::from_millis(worked_ms(self, now));
        let total_break_time = WorkDuration::from_millis(self.closed_break_ms());
        let record = DailyRecord {
            session_id: self.session_id.take(),
            date: check_in.date_naive(),
            check_in_time: check_in.format(CLOCK_FORMAT).to_string(),
            check_out_time: now.format(CLOCK_FORMAT).to_string(),
            total_work_time,
            total_break_time,
            breaks: std::mem::take(&mut self.break_history),
            efficiency: efficiency(
                total_work_time.total_minutes(),
                total_break_time.total_minutes(),
            ),
        };

        *self = Self::default();
        Ok(record)
    }
}
