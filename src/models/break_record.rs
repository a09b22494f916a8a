use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkDuration;

/// One contiguous break inside a check-in session.
///
/// Opened with only `start_time`; `end_time` and `duration` are filled in when
/// the break ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakRecord {
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: WorkDuration,
}

impl BreakRecord {
    pub fn open(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: None,
            duration: WorkDuration::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn close(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        self.duration = WorkDuration::from_chrono(end_time - self.start_time);
    }

    /// Milliseconds covered by a closed break; open breaks count as zero here.
    pub fn closed_ms(&self) -> i64 {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds().max(0))
            .unwrap_or(0)
    }
}
