use chrono::{DateTime, Utc};

use crate::models::{DailyRecord, Notification, NotificationKind, WorkDuration};

use super::{accrual::Accrual, state::Phase};

pub const WELCOME_ID: &str = "welcome";
pub const BREAK_ENDED_ID: &str = "break-ended";
pub const DAY_SUMMARY_ID: &str = "day-summary";

struct Rule {
    id: &'static str,
    kind: NotificationKind,
    applies: fn(&Accrual, bool) -> bool,
    message: fn(&Accrual) -> String,
}

fn long_work_session(accrual: &Accrual, on_break: bool) -> bool {
    !on_break && accrual.worked.hours >= 4 && accrual.worked.minutes >= 30
}

fn long_break(accrual: &Accrual, on_break: bool) -> bool {
    on_break && accrual.current_break.minutes >= 45
}

fn two_hours_working(accrual: &Accrual, on_break: bool) -> bool {
    !on_break && accrual.worked.hours >= 2
}

fn long_work_message(accrual: &Accrual) -> String {
    format!(
        "You have been working for {}. Consider a longer break.",
        accrual.worked
    )
}

fn long_break_message(accrual: &Accrual) -> String {
    format!("Your break has lasted {}.", accrual.current_break)
}

fn hydration_message(_: &Accrual) -> String {
    "Remember to drink some water and check your posture.".to_string()
}

fn break_reminder_message(_: &Accrual) -> String {
    "You have been working for a while. Time for a short break?".to_string()
}

// Rules are independent; several may fire on the same tick.
// The two reminders share a guard but stay separate messages with their own ids.
const RULES: &[Rule] = &[
    Rule {
        id: "long-work-session",
        kind: NotificationKind::Warning,
        applies: long_work_session,
        message: long_work_message,
    },
    Rule {
        id: "long-break",
        kind: NotificationKind::Warning,
        applies: long_break,
        message: long_break_message,
    },
    Rule {
        id: "hydration-reminder",
        kind: NotificationKind::Info,
        applies: two_hours_working,
        message: hydration_message,
    },
    Rule {
        id: "break-reminder",
        kind: NotificationKind::Info,
        applies: two_hours_working,
        message: break_reminder_message,
    },
];

/// Evaluates the reminder table for an active session. Checked-out sessions
/// produce nothing.
pub fn evaluate(accrual: &Accrual, phase: Phase, now: DateTime<Utc>) -> Vec<Notification> {
    if !phase.is_active() {
        return Vec::new();
    }
    let on_break = phase == Phase::OnBreak;

    RULES
        .iter()
        .filter(|rule| (rule.applies)(accrual, on_break))
        .map(|rule| Notification::new(rule.id, rule.kind, (rule.message)(accrual), now))
        .collect()
}

pub fn welcome(now: DateTime<Utc>) -> Notification {
    Notification::new(
        WELCOME_ID,
        NotificationKind::Success,
        format!("Welcome! Checked in at {}.", now.format("%H:%M")),
        now,
    )
}

pub fn break_ended(duration: WorkDuration, now: DateTime<Utc>) -> Notification {
    Notification::new(
        BREAK_ENDED_ID,
        NotificationKind::Info,
        format!("Break ended. Duration: {duration}."),
        now,
    )
}

pub fn day_summary(record: &DailyRecord, now: DateTime<Utc>) -> Notification {
    Notification::new(
        DAY_SUMMARY_ID,
        NotificationKind::Success,
        format!(
            "Day complete: worked {}, breaks {}, efficiency {}%.",
            record.total_work_time, record.total_break_time, record.efficiency
        ),
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn accrual(worked_min: i64, break_min: i64) -> Accrual {
        Accrual {
            worked: WorkDuration::from_millis(worked_min * 60_000),
            current_break: WorkDuration::from_millis(break_min * 60_000),
            total_break: WorkDuration::from_millis(break_min * 60_000),
        }
    }

    fn ids(list: &[Notification]) -> Vec<&str> {
        list.iter().map(|n| n.id.as_str()).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).single().unwrap()
    }

    #[test]
    fn nothing_fires_early_in_the_day() {
        assert!(evaluate(&accrual(90, 0), Phase::Working, now()).is_empty());
    }

    #[test]
    fn two_hour_reminders_fire_together() {
        let fired = evaluate(&accrual(125, 0), Phase::Working, now());
        assert_eq!(ids(&fired), vec!["hydration-reminder", "break-reminder"]);
    }

    #[test]
    fn long_session_warning_uses_minute_component() {
        let fired = evaluate(&accrual(4 * 60 + 30, 0), Phase::Working, now());
        assert_eq!(
            ids(&fired),
            vec!["long-work-session", "hydration-reminder", "break-reminder"]
        );

        let fired = evaluate(&accrual(5 * 60 + 10, 0), Phase::Working, now());
        assert!(!ids(&fired).contains(&"long-work-session"));
    }

    #[test]
    fn long_break_only_while_on_break() {
        let fired = evaluate(&accrual(300, 50), Phase::OnBreak, now());
        assert_eq!(ids(&fired), vec!["long-break"]);
        assert!(evaluate(&accrual(300, 50), Phase::CheckedOut, now()).is_empty());
    }

    #[test]
    fn break_ended_mentions_duration() {
        let n = break_ended(WorkDuration::from_millis(15 * 60_000), now());
        assert_eq!(n.kind, NotificationKind::Info);
        assert!(n.message.contains("00:15:00"));
    }
}
