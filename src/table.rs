use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::models::Task;
use crate::status::{compare_status, goal_label, task_status, TaskStatus};

/// Filter value meaning "every category".
pub const ALL_CATEGORIES: &str = "All";

/// Columns of the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Done,
    Name,
    Status,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Done => "",
            Column::Name => "Task / Goal",
            Column::Status => "Status",
        }
    }

    pub fn sortable(&self) -> bool {
        !matches!(self, Column::Done)
    }

    /// Ascending comparison for this column. `Done` has no ordering of its own.
    pub fn compare(&self, a: &TableRow<'_>, b: &TableRow<'_>) -> Ordering {
        match self {
            Column::Done => Ordering::Equal,
            Column::Name => a
                .task
                .name
                .cmp(&b.task.name)
                .then_with(|| a.task.id.cmp(&b.task.id)),
            Column::Status => compare_status((a.task, &a.status), (b.task, &b.status)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Active sort: one column and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sorting {
    pub column: Column,
    pub direction: Direction,
}

impl Sorting {
    pub fn asc(column: Column) -> Self {
        Self { column, direction: Direction::Asc }
    }

    pub fn desc(column: Column) -> Self {
        Self { column, direction: Direction::Desc }
    }

    /// Header click: a new column starts ascending, the current one flips.
    pub fn toggle(current: Option<Sorting>, column: Column) -> Option<Sorting> {
        if !column.sortable() {
            return current;
        }
        match current {
            Some(s) if s.column == column => Some(Sorting {
                column,
                direction: match s.direction {
                    Direction::Asc => Direction::Desc,
                    Direction::Desc => Direction::Asc,
                },
            }),
            _ => Some(Sorting::asc(column)),
        }
    }

    fn compare(&self, a: &TableRow<'_>, b: &TableRow<'_>) -> Ordering {
        let ord = self.column.compare(a, b);
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// Category filter. `None` lets every task through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter(Option<String>);

impl CategoryFilter {
    /// Blank input or `"All"` disables the filter. Any other value is kept
    /// verbatim so it compares equal to the category it came from.
    pub fn parse(value: &str) -> Self {
        if value.trim().is_empty() || value == ALL_CATEGORIES {
            CategoryFilter(None)
        } else {
            CategoryFilter(Some(value.to_string()))
        }
    }

    pub fn all() -> Self {
        CategoryFilter(None)
    }

    /// Filter on one entry of [`categories`], taken as is.
    pub fn only(category: impl Into<String>) -> Self {
        CategoryFilter(Some(category.into()))
    }

    pub fn matches(&self, task: &Task) -> bool {
        match &self.0 {
            None => true,
            Some(wanted) => task.category.as_deref() == Some(wanted.as_str()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or(ALL_CATEGORIES))
    }
}

/// Distinct non-empty categories, sorted.
pub fn categories(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .filter_map(|t| t.category.as_deref())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One displayed row: the task and everything derived from it.
#[derive(Debug, Clone)]
pub struct TableRow<'a> {
    pub task: &'a Task,
    pub status: TaskStatus,
    pub goal_label: String,
    pub selected: bool,
}

impl TableRow<'_> {
    /// Text for a column cell.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Done => (if self.selected { "[x]" } else { "[ ]" }).to_string(),
            Column::Name => format!("{}\n{}", self.task.name, self.goal_label),
            Column::Status => format!("{}\n{}", self.status.date_text, self.status.days_text),
        }
    }
}

/// Table state: sorting, filters and selected rows.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    pub sorting: Option<Sorting>,
    pub category_filter: CategoryFilter,
    pub name_filter: String,
    selection: HashSet<u64>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = Some(sorting);
        self
    }

    pub fn with_category(mut self, filter: CategoryFilter) -> Self {
        self.category_filter = filter;
        self
    }

    pub fn with_name_filter(mut self, text: impl Into<String>) -> Self {
        self.name_filter = text.into();
        self
    }

    pub fn toggle_sort(&mut self, column: Column) {
        self.sorting = Sorting::toggle(self.sorting, column);
    }

    pub fn toggle_selected(&mut self, id: u64) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selection.contains(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids in ascending order.
    pub fn selected_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.selection.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Name filter: case-insensitive substring, blank matches everything.
    fn name_matches(&self, task: &Task) -> bool {
        let needle = self.name_filter.trim();
        needle.is_empty() || task.name.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Builds the visible rows. Every row is evaluated against the same `now`.
    pub fn rows<'a, Tz: TimeZone>(&self, tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<TableRow<'a>>
    where
        Tz::Offset: fmt::Display,
    {
        let mut rows: Vec<TableRow<'a>> = tasks
            .iter()
            .filter(|t| self.category_filter.matches(t) && self.name_matches(t))
            .map(|task| TableRow {
                task,
                status: task_status(task, now),
                goal_label: goal_label(task.goal()),
                selected: self.is_selected(task.id),
            })
            .collect();

        if let Some(sorting) = self.sorting {
            rows.sort_by(|a, b| sorting.compare(a, b));
        }
        rows
    }

    /// Placeholder when `rows` came back empty.
    pub fn empty_message(total_tasks: usize) -> &'static str {
        if total_tasks == 0 {
            "No tasks added yet."
        } else {
            "No results."
        }
    }
}
