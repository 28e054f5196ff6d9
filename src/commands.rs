use std::io::{self, Write};

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::{debug, info};

use crate::config::{load_settings, save_settings, SettingsPatch, SETTINGS_FILE};
use crate::models::{Settings, Task};
use crate::status::will_send_email_reminder;
use crate::storage::{next_id, Store};
use crate::table::{categories, CategoryFilter, Column, Sorting, TaskTable};

/// Clamps a user supplied interval. Negative values disable the goal.
fn clamp_days(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Adds a new task and returns its id.
///
/// `every` sets a repeat goal; a missing or non-positive interval leaves the
/// task without one.
#[tracing::instrument(skip(store))]
pub fn cmd_add(
    store: &Store,
    name: String,
    category: Option<String>,
    every: Option<i64>,
    remind_by_email: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<u64> {
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("task name must not be empty");
    }
    let mut tasks = store.load_tasks()?;
    let id = next_id(&tasks);
    let days_repeat = every.map(clamp_days).unwrap_or(0);

    let mut task = Task::new(id, name, now);
    task.category = category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    task.repeat_goal_enabled = days_repeat > 0;
    task.days_repeat = days_repeat;
    task.remind_by_email = remind_by_email;
    tasks.push(task);

    store.save_tasks(&tasks).context("failed to save tasks")?;
    info!(id, "task added");
    Ok(id)
}

/// Options for [`cmd_list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub category: Option<String>,
    pub name_filter: Option<String>,
    pub sort_by_name: bool,
    pub descending: bool,
}

impl ListOptions {
    fn table(&self) -> TaskTable {
        let column = if self.sort_by_name { Column::Name } else { Column::Status };
        let sorting = if self.descending { Sorting::desc(column) } else { Sorting::asc(column) };
        TaskTable::new()
            .with_sorting(sorting)
            .with_category(CategoryFilter::parse(self.category.as_deref().unwrap_or("")))
            .with_name_filter(self.name_filter.clone().unwrap_or_default())
    }
}

/// Renders the task table. `now` is used for every row.
pub fn render_task_table<Tz: TimeZone>(
    tasks: &[Task],
    table_state: &TaskTable,
    settings: &Settings,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let rows = table_state.rows(tasks, now);
    if rows.is_empty() {
        return TaskTable::empty_message(tasks.len()).to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new(Column::Name.header()).add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Last Done").add_attribute(Attribute::Bold),
            Cell::new("Days").add_attribute(Attribute::Bold),
            Cell::new("Email").add_attribute(Attribute::Bold),
        ]);

    for row in rows {
        let goal_color = if row.task.goal().is_active() { Color::Reset } else { Color::Grey };
        let days_color = if row.status.task_is_late { Color::Red } else { Color::Reset };
        let email = if will_send_email_reminder(settings, row.task) { "yes" } else { "" };
        table.add_row(vec![
            Cell::new(row.task.id),
            Cell::new(format!("{}\n{}", row.task.name, row.goal_label)).fg(goal_color),
            Cell::new(row.task.category.as_deref().unwrap_or_default()),
            Cell::new(&row.status.date_text),
            Cell::new(&row.status.days_text).fg(days_color),
            Cell::new(email),
        ]);
    }
    table.to_string()
}

/// Renders tasks as a table, most urgent first unless told otherwise.
#[tracing::instrument(skip(store))]
pub fn cmd_list(store: &Store, options: &ListOptions, now: DateTime<Utc>) -> anyhow::Result<String> {
    let tasks = store.load_tasks()?;
    let settings = load_settings(store)?;
    let local_now = now.with_timezone(&Local);
    Ok(render_task_table(&tasks, &options.table(), &settings, &local_now))
}

/// Parses a completion time: RFC 3339, or a bare date taken as local noon.
pub fn parse_completion_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid time '{}'. Use YYYY-MM-DD or RFC 3339.", value))?;
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow!("invalid time '{}'", value))?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("'{}' does not exist in the local time zone", value))
}

fn find_task<'a>(tasks: &'a mut [Task], id: u64) -> anyhow::Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow!("Task {} not found.", id))
}

/// Records a completion of a task at `at`.
#[tracing::instrument(skip(store))]
pub fn cmd_done(store: &Store, id: u64, at: DateTime<Utc>) -> anyhow::Result<Task> {
    let mut tasks = store.load_tasks()?;
    let task = find_task(&mut tasks, id)?;
    task.history.push(at);
    let updated = task.clone();
    store.save_tasks(&tasks).context("failed to save tasks")?;
    info!(id, %at, completions = updated.history.len(), "completion recorded");
    Ok(updated)
}

/// Drops the most recent completion of a task.
#[tracing::instrument(skip(store))]
pub fn cmd_undo(store: &Store, id: u64) -> anyhow::Result<Option<DateTime<Utc>>> {
    let mut tasks = store.load_tasks()?;
    let task = find_task(&mut tasks, id)?;
    let removed = task.pop_latest_completion();
    if let Some(ts) = removed {
        store.save_tasks(&tasks).context("failed to save tasks")?;
        info!(id, %ts, "completion removed");
    }
    Ok(removed)
}

/// Renders a task's completions, newest first.
pub fn cmd_history(store: &Store, id: u64) -> anyhow::Result<String> {
    let task = store
        .load_task(id)?
        .ok_or_else(|| anyhow!("Task {} not found.", id))?;
    if task.history.is_empty() {
        return Ok(format!("{} has never been completed.", task.name));
    }
    let mut history = task.history.clone();
    history.sort_unstable_by(|a, b| b.cmp(a));
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["#", "Completed"]);
    for (i, ts) in history.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    Ok(format!("{}\n{table}", task.name))
}

/// Changes to an existing task. `None` leaves a field alone.
#[derive(Debug, Default, Clone)]
pub struct TaskEdit {
    pub name: Option<String>,
    /// Empty string clears the category.
    pub category: Option<String>,
    pub every: Option<i64>,
    pub goal_enabled: Option<bool>,
    pub remind_by_email: Option<bool>,
}

/// Edits an existing task's details.
#[tracing::instrument(skip(store))]
pub fn cmd_edit(store: &Store, id: u64, edit: TaskEdit) -> anyhow::Result<Task> {
    let mut tasks = store.load_tasks()?;
    let task = find_task(&mut tasks, id)?;
    if let Some(n) = edit.name {
        let n = n.trim();
        if n.is_empty() {
            bail!("task name must not be empty");
        }
        task.name = n.to_string();
    }
    if let Some(c) = edit.category {
        let c = c.trim();
        task.category = if c.is_empty() { None } else { Some(c.to_string()) };
    }
    if let Some(days) = edit.every {
        task.days_repeat = clamp_days(days);
        task.repeat_goal_enabled = task.days_repeat > 0;
    }
    if let Some(enabled) = edit.goal_enabled {
        task.repeat_goal_enabled = enabled;
    }
    if let Some(email) = edit.remind_by_email {
        task.remind_by_email = email;
    }
    let updated = task.clone();
    store.save_tasks(&tasks).context("failed to save tasks")?;
    debug!(?updated, "task edited");
    Ok(updated)
}

/// Removes a task from the database by ID.
#[tracing::instrument(skip(store))]
pub fn cmd_remove(store: &Store, id: u64) -> anyhow::Result<()> {
    let mut tasks = store.load_tasks()?;
    let len_before = tasks.len();
    tasks.retain(|t| t.id != id);
    if tasks.len() == len_before {
        bail!("Task {} not found.", id);
    }
    store.save_tasks(&tasks).context("failed to save tasks")?;
    info!(id, "task removed");
    Ok(())
}

/// Distinct categories in use.
pub fn cmd_categories(store: &Store) -> anyhow::Result<Vec<String>> {
    Ok(categories(&store.load_tasks()?))
}

pub fn cmd_settings_show(store: &Store) -> anyhow::Result<String> {
    let settings = load_settings(store)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    table.add_row(vec![
        "Reminder email".to_string(),
        settings.remind_email.clone().unwrap_or_else(|| "-".into()),
    ]);
    table.add_row(vec![
        "Email reminders".to_string(),
        (if settings.remind_by_email_enabled { "on" } else { "off" }).to_string(),
    ]);
    table.add_row(vec!["Theme".to_string(), format!("{:?}", settings.theme).to_lowercase()]);
    Ok(table.to_string())
}

/// Applies and saves a settings change.
#[tracing::instrument(skip(store))]
pub fn cmd_settings_set(store: &Store, patch: SettingsPatch) -> anyhow::Result<Settings> {
    let mut settings = load_settings(store)?;
    patch.apply(&mut settings)?;
    save_settings(store, &settings)?;
    Ok(settings)
}

/// Asks for confirmation on stdin. Anything but `y` is a no.
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Deletes all tasks and settings.
#[tracing::instrument(skip(store))]
pub fn cmd_reset(store: &Store) -> anyhow::Result<()> {
    store
        .delete_database(&[SETTINGS_FILE])
        .context("failed to reset database")?;
    Ok(())
}
