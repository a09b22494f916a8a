use std::fmt;

use serde::{Deserialize, Serialize};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Hours/minutes/seconds view of an elapsed span.
///
/// Always derived from a millisecond delta, never accumulated, so repeated
/// recomputation cannot drift. Hours are not folded into days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkDuration {
    pub hours: u64,
    pub minutes: u32,
    pub seconds: u32,
}

impl WorkDuration {
    pub const ZERO: WorkDuration = WorkDuration {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Negative deltas clamp to zero; sub-second remainders are dropped.
    pub fn from_millis(ms: i64) -> Self {
        let ms = ms.max(0);
        Self {
            hours: (ms / MS_PER_HOUR) as u64,
            minutes: ((ms % MS_PER_HOUR) / MS_PER_MINUTE) as u32,
            seconds: ((ms % MS_PER_MINUTE) / MS_PER_SECOND) as u32,
        }
    }

    pub fn from_chrono(delta: chrono::Duration) -> Self {
        Self::from_millis(delta.num_milliseconds())
    }

    pub fn total_minutes(&self) -> u64 {
        self.hours * 60 + u64::from(self.minutes)
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_minutes() * 60 + u64::from(self.seconds)
    }

    pub fn as_millis(&self) -> i64 {
        i64::try_from(self.total_seconds())
            .unwrap_or(i64::MAX / MS_PER_SECOND)
            .saturating_mul(MS_PER_SECOND)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_millis_with_modulo_chaining() {
        let d = WorkDuration::from_millis(7 * MS_PER_HOUR + 45 * MS_PER_MINUTE + 9_999);
        assert_eq!(
            d,
            WorkDuration {
                hours: 7,
                minutes: 45,
                seconds: 9
            }
        );
        assert_eq!(d.to_string(), "07:45:09");
    }

    #[test]
    fn negative_delta_clamps_to_zero() {
        assert_eq!(WorkDuration::from_millis(-5_000), WorkDuration::ZERO);
    }

    #[test]
    fn hours_are_not_folded_into_days() {
        let d = WorkDuration::from_millis(30 * MS_PER_HOUR);
        assert_eq!(d.hours, 30);
        assert_eq!(d.to_string(), "30:00:00");
    }

    #[test]
    fn total_minutes_ignores_seconds() {
        let d = WorkDuration::from_millis(MS_PER_HOUR + 59_000);
        assert_eq!(d.total_minutes(), 60);
        assert_eq!(d.as_millis(), MS_PER_HOUR + 59_000);
    }
}
