use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BreakRecord, WorkDuration};

/// The live check-in session, persisted as a single JSON blob.
///
/// Every field defaults so a blob written by an older build, or one missing
/// fields, still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub is_checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub is_on_break: bool,
    pub last_break_time: Option<DateTime<Utc>>,
    pub break_history: Vec<BreakRecord>,
    pub total_break_time: WorkDuration,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_checked_in && self.check_in_time.is_none()
    }

    pub fn open_break(&self) -> Option<&BreakRecord> {
        self.break_history.last().filter(|record| record.is_open())
    }

    pub fn open_break_mut(&mut self) -> Option<&mut BreakRecord> {
        self.break_history.last_mut().filter(|record| record.is_open())
    }

    /// Sum of closed break spans, in milliseconds.
    pub fn closed_break_ms(&self) -> i64 {
        self.break_history.iter().map(BreakRecord::closed_ms).sum()
    }

    /// Repairs a restored blob so the on-break and checked-in invariants hold.
    ///
    /// A session without a check-in time is discarded. A break flag without a
    /// matching open record (or the reverse) is reconciled from whichever side
    /// carries a timestamp.
    pub fn normalized(mut self) -> Self {
        self.is_checked_in = self.is_checked_in && self.check_in_time.is_some();
        if !self.is_checked_in {
            return Self::default();
        }

        // Only the last record may be open.
        let last = self.break_history.len().saturating_sub(1);
        for (index, record) in self.break_history.iter_mut().enumerate() {
            if index != last && record.is_open() {
                record.close(record.start_time);
            }
        }

        let open_start = self.open_break().map(|record| record.start_time);
        match (self.is_on_break, self.last_break_time, open_start) {
            (true, Some(_), Some(start)) => self.last_break_time = Some(start),
            (_, _, Some(start)) => {
                self.is_on_break = true;
                self.last_break_time = Some(start);
            }
            (true, Some(started), None) => {
                self.break_history.push(BreakRecord::open(started));
            }
            _ => {
                self.is_on_break = false;
                self.last_break_time = None;
            }
        }

        self.total_break_time = WorkDuration::from_millis(self.closed_break_ms());
        self
    }
}
