use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Represents a single habit tracked by Long Habit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: u64,
    /// The name or description of the habit.
    pub name: String,
    /// Optional free-text category used for filtering.
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the repeat goal is active.
    #[serde(default)]
    pub repeat_goal_enabled: bool,
    /// Target interval in days. Only meaningful when `repeat_goal_enabled` is set.
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_repeat: u32,
    /// Per-task opt-in for email reminders.
    #[serde(default)]
    pub remind_by_email: bool,
    /// Completion timestamps, in the order they were recorded.
    #[serde(default)]
    pub history: Vec<DateTime<Utc>>,
    /// Timestamp when the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: u64, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            category: None,
            repeat_goal_enabled: false,
            days_repeat: 0,
            remind_by_email: false,
            history: Vec::new(),
            created_at: now,
        }
    }

    /// The repeat goal with both goal fields taken into account.
    pub fn goal(&self) -> Goal {
        Goal::from_parts(self.repeat_goal_enabled, i64::from(self.days_repeat))
    }

    /// Most recent completion. History is not assumed to be sorted.
    pub fn last_completed(&self) -> Option<DateTime<Utc>> {
        self.history.iter().max().copied()
    }

    /// Removes the most recent completion, returning it.
    pub fn pop_latest_completion(&mut self) -> Option<DateTime<Utc>> {
        let (idx, _) = self.history.iter().enumerate().max_by_key(|(_, ts)| **ts)?;
        Some(self.history.remove(idx))
    }
}

/// Normalised repeat goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    None,
    Every(u32),
}

impl Goal {
    /// Collapses the raw goal fields. Negative or zero intervals disable the goal.
    pub fn from_parts(enabled: bool, days_repeat: i64) -> Self {
        match u32::try_from(days_repeat) {
            Ok(days) if enabled && days > 0 => Goal::Every(days),
            _ => Goal::None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Goal::Every(_))
    }
}

/// Colour scheme preference.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

/// Account-wide preferences.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Settings {
    /// Address reminders would be sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_email: Option<String>,
    /// Global switch for email reminders.
    #[serde(default)]
    pub remind_by_email_enabled: bool,
    #[serde(default)]
    pub theme: Theme,
}

/// Turns any JSON value into a day count. Anything that is not a non-negative
/// number becomes 0.
pub fn normalize_days(value: &serde_json::Value) -> u32 {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(n) if n.is_finite() && n > 0.0 => n.floor().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn lenient_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_days(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn days_repeat_is_normalised_when_loading() {
        let raw = json!([
            {"id": 1, "name": "a", "days_repeat": "7", "created_at": "2026-01-01T00:00:00Z"},
            {"id": 2, "name": "b", "days_repeat": -3, "created_at": "2026-01-01T00:00:00Z"},
            {"id": 3, "name": "c", "days_repeat": "weekly", "created_at": "2026-01-01T00:00:00Z"},
            {"id": 4, "name": "d", "days_repeat": 2.7, "created_at": "2026-01-01T00:00:00Z"},
            {"id": 5, "name": "e", "days_repeat": null, "created_at": "2026-01-01T00:00:00Z"}
        ]);
        let tasks: Vec<Task> = serde_json::from_value(raw).unwrap();
        let days: Vec<u32> = tasks.iter().map(|t| t.days_repeat).collect();
        assert_eq!(days, vec![7, 0, 0, 2, 0]);
    }

    #[test]
    fn goal_requires_flag_and_positive_interval() {
        assert_eq!(Goal::from_parts(true, 3), Goal::Every(3));
        assert_eq!(Goal::from_parts(true, 0), Goal::None);
        assert_eq!(Goal::from_parts(true, -2), Goal::None);
        assert_eq!(Goal::from_parts(false, 3), Goal::None);
    }

    #[test]
    fn latest_completion_ignores_order() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let mut task = Task::new(1, "Run".into(), now);
        let newest = Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap();
        task.history = vec![
            Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
            newest,
            Utc.with_ymd_and_hms(2026, 10, 10, 8, 0, 0).unwrap(),
        ];
        assert_eq!(task.last_completed(), Some(newest));
        assert_eq!(task.pop_latest_completion(), Some(newest));
        assert_eq!(task.history.len(), 2);
        assert!(task.last_completed() < Some(newest));
    }
}
