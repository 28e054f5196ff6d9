use std::cmp::{Ordering, Reverse};
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{Goal, Settings, Task};

/// Shown in place of a date when a task has no completions.
pub const NEVER_COMPLETED: &str = "never completed";
/// Days text for tasks without an active goal.
pub const NO_GOAL: &str = "no goal";
/// Days text for goal tasks that have never been completed.
pub const NOT_STARTED: &str = "not started";

const DATE_FORMAT: &str = "%b %-d, %Y";

/// Urgency of a task, ordered from most to least urgent.
///
/// The derived `Ord` follows variant order first, then the payload:
/// - `Late`: more days overdue sorts first.
/// - `Due`: fewer days remaining sorts first.
/// - `Unstarted`: goal set but never completed.
/// - `Idle`: no goal; the longer since the last completion, the earlier.
/// - `Never`: no goal and never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Late(Reverse<i64>),
    Due(i64),
    Unstarted,
    Idle(Reverse<i64>),
    Never,
}

/// Display values for the status column plus the key used to sort it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub date_text: String,
    pub days_text: String,
    pub task_is_late: bool,
    /// Whole days since the last completion, if there is one.
    pub days_since: Option<i64>,
    pub urgency: Urgency,
}

/// Derives the status of a task from its goal settings and completion history.
///
/// `now` is passed in rather than read from the clock so one table pass can
/// evaluate every row against the same instant. The last completion date is
/// rendered in `now`'s time zone.
///
/// A task with an active goal but no history is never late: there is no
/// completion to measure from.
pub fn derive_status<Tz: TimeZone>(
    repeat_goal_enabled: bool,
    days_repeat: i64,
    history: &[DateTime<Utc>],
    now: &DateTime<Tz>,
) -> TaskStatus
where
    Tz::Offset: fmt::Display,
{
    let goal = Goal::from_parts(repeat_goal_enabled, days_repeat);
    let Some(last) = history.iter().max() else {
        let (days_text, urgency) = match goal {
            Goal::Every(_) => (NOT_STARTED, Urgency::Unstarted),
            Goal::None => (NO_GOAL, Urgency::Never),
        };
        return TaskStatus {
            date_text: NEVER_COMPLETED.to_string(),
            days_text: days_text.to_string(),
            task_is_late: false,
            days_since: None,
            urgency,
        };
    };

    // completions stamped in the future count as today
    let days_since = now
        .with_timezone(&Utc)
        .signed_duration_since(*last)
        .num_days()
        .max(0);
    let date_text = last
        .with_timezone(&now.timezone())
        .format(DATE_FORMAT)
        .to_string();

    let (days_text, task_is_late, urgency) = match goal {
        Goal::None => (NO_GOAL.to_string(), false, Urgency::Idle(Reverse(days_since))),
        Goal::Every(days) => {
            let days = i64::from(days);
            if days_since > days {
                let overdue = days_since - days;
                (format!("{} late", plural_days(overdue)), true, Urgency::Late(Reverse(overdue)))
            } else {
                let remaining = days - days_since;
                let text = if remaining == 0 {
                    "due today".to_string()
                } else {
                    format!("{} left", plural_days(remaining))
                };
                (text, false, Urgency::Due(remaining))
            }
        }
    };

    TaskStatus {
        date_text,
        days_text,
        task_is_late,
        days_since: Some(days_since),
        urgency,
    }
}

/// Convenience wrapper over [`derive_status`] for a whole task.
pub fn task_status<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> TaskStatus
where
    Tz::Offset: fmt::Display,
{
    derive_status(
        task.repeat_goal_enabled,
        i64::from(task.days_repeat),
        &task.history,
        now,
    )
}

/// Orders two tasks by urgency, then by name, then by id. Total, so sorting
/// with it is deterministic.
pub fn compare_status(a: (&Task, &TaskStatus), b: (&Task, &TaskStatus)) -> Ordering {
    a.1.urgency
        .cmp(&b.1.urgency)
        .then_with(|| a.0.name.cmp(&b.0.name))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Sorts tasks in place, most urgent first.
pub fn sort_by_status<Tz: TimeZone>(tasks: &mut [Task], now: &DateTime<Tz>)
where
    Tz::Offset: fmt::Display,
{
    tasks.sort_by_cached_key(|t| (task_status(t, now).urgency, t.name.clone(), t.id));
}

/// "every 3 days", "every 1 day" or "no goal".
pub fn goal_label(goal: Goal) -> String {
    match goal {
        Goal::Every(days) => format!("every {}", plural_days(i64::from(days))),
        Goal::None => NO_GOAL.to_string(),
    }
}

/// A reminder goes out only when reminders are on globally, the task has an
/// active goal and the task opted in.
pub fn will_send_email_reminder(settings: &Settings, task: &Task) -> bool {
    settings.remind_by_email_enabled && task.goal().is_active() && task.remind_by_email
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    #[test]
    fn date_text_uses_callers_time_zone() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 0).unwrap();
        let utc = derive_status(true, 3, &[last], &now);
        assert_eq!(utc.date_text, "Oct 15, 2026");

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = derive_status(true, 3, &[last], &now.with_timezone(&tokyo));
        assert_eq!(local.date_text, "Oct 16, 2026");
        assert_eq!(local.days_since, utc.days_since);
    }

    #[test]
    fn partial_days_round_down() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let last = now - Duration::hours(47);
        let status = derive_status(true, 1, &[last], &now);
        assert_eq!(status.days_since, Some(1));
        assert!(!status.task_is_late);
        assert_eq!(status.days_text, "due today");
    }

    #[test]
    fn future_completion_counts_as_today() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let status = derive_status(true, 2, &[now + Duration::days(3)], &now);
        assert_eq!(status.days_since, Some(0));
        assert_eq!(status.days_text, "2 days left");
    }

    #[test]
    fn urgency_order() {
        let mut keys = vec![
            Urgency::Never,
            Urgency::Idle(Reverse(2)),
            Urgency::Due(3),
            Urgency::Late(Reverse(1)),
            Urgency::Unstarted,
            Urgency::Idle(Reverse(9)),
            Urgency::Late(Reverse(4)),
            Urgency::Due(0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Urgency::Late(Reverse(4)),
                Urgency::Late(Reverse(1)),
                Urgency::Due(0),
                Urgency::Due(3),
                Urgency::Unstarted,
                Urgency::Idle(Reverse(9)),
                Urgency::Idle(Reverse(2)),
                Urgency::Never,
            ]
        );
    }
}
