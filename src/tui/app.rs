use chrono::{DateTime, Local, Utc};
use ratatui::widgets::TableState;
use tracing::warn;

use crate::commands::{cmd_add, cmd_done, cmd_edit, cmd_remove, cmd_undo, TaskEdit};
use crate::config::load_settings;
use crate::models::{Settings, Task};
use crate::storage::Store;
use crate::table::{categories, CategoryFilter, Column, Sorting, TableRow, TaskTable};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(PartialEq)]
pub enum InputField {
    None,
    Name,
    Category,
    Every,
    Filter,
}

/// Result of the last action, shown in the footer.
pub enum Message {
    Success(String),
    Error(String),
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub name: String,
    pub category: Option<String>,
    pub step: usize, // 0: Name, 1: Category, 2: Every
}

pub struct App {
    pub store: Store,
    pub tasks: Vec<Task>,
    pub settings: Settings,
    pub table: TaskTable,
    pub state: TableState,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<u64>,
    pub add_state: AddState,
    pub message: Option<Message>,
    /// Task ids in the order last drawn. Row indices resolve against this.
    pub visible_ids: Vec<u64>,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(store: Store) -> App {
        let mut app = App {
            store,
            tasks: Vec::new(),
            settings: Settings::default(),
            table: TaskTable::new().with_sorting(Sorting::asc(Column::Status)),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            message: None,
            visible_ids: Vec::new(),
        };
        app.reload();
        if !app.tasks.is_empty() {
            app.state.select(Some(0));
        }
        app
    }

    /// Reloads tasks and settings from storage.
    pub fn reload(&mut self) {
        match self.store.load_tasks() {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                warn!(error = %e, "failed to load tasks");
                self.error("Failed to load tasks", e);
            }
        }
        match load_settings(&self.store) {
            Ok(settings) => self.settings = settings,
            Err(e) => self.error("Failed to load settings", e),
        }
        self.refresh_visible(Local::now());
    }

    /// Visible rows for a single render pass.
    pub fn rows(&self, now: DateTime<Local>) -> Vec<TableRow<'_>> {
        self.table.rows(&self.tasks, &now)
    }

    /// Records the row order for `now` and keeps the highlight in range.
    pub fn refresh_visible(&mut self, now: DateTime<Local>) {
        self.visible_ids = self.rows(now).iter().map(|r| r.task.id).collect();
        self.clamp_selection();
    }

    fn selected_id(&self) -> Option<u64> {
        let i = self.state.selected()?;
        self.visible_ids.get(i).copied()
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_ids.len();
        if len == 0 {
            self.state.select(None);
        } else if self.state.selected().map_or(true, |i| i >= len) {
            self.state.select(Some(len - 1));
        }
    }

    /// Selects the next row, wrapping around.
    pub fn next(&mut self) {
        let len = self.visible_ids.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous row, wrapping around.
    pub fn previous(&mut self) {
        let len = self.visible_ids.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn success(&mut self, text: impl Into<String>) {
        self.message = Some(Message::Success(text.into()));
    }

    fn error(&mut self, title: &str, err: impl std::fmt::Display) {
        self.message = Some(Message::Error(format!("{}: {}", title, err)));
    }

    /// Records a completion for the highlighted task.
    pub fn complete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match cmd_done(&self.store, id, Utc::now()) {
            Ok(task) => self.success(format!("{} marked as done", task.name)),
            Err(e) => self.error("Could not mark task as done", e),
        }
        self.reload();
    }

    /// Removes the latest completion of the highlighted task.
    pub fn undo_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match cmd_undo(&self.store, id) {
            Ok(Some(_)) => self.success("Last completion removed"),
            Ok(None) => self.success("Nothing to undo"),
            Err(e) => self.error("Could not undo", e),
        }
        self.reload();
    }

    /// Deletes the highlighted task.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match cmd_remove(&self.store, id) {
            Ok(()) => self.success(format!("Task {} removed", id)),
            Err(e) => self.error("Could not remove task", e),
        }
        self.reload();
    }

    /// Toggles the row checkbox of the highlighted task.
    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.table.toggle_selected(id);
        }
    }

    /// Marks every checked row as done and clears the checks.
    pub fn complete_checked(&mut self) {
        let ids = self.table.selected_ids();
        if ids.is_empty() {
            return;
        }
        let now = Utc::now();
        let mut done = 0;
        for id in ids {
            match cmd_done(&self.store, id, now) {
                Ok(_) => done += 1,
                Err(e) => {
                    self.error("Could not mark task as done", e);
                    break;
                }
            }
        }
        self.table.clear_selection();
        if done > 0 {
            self.success(format!("{} tasks marked as done", done));
        }
        self.reload();
    }

    pub fn toggle_sort(&mut self, column: Column) {
        self.table.toggle_sort(column);
    }

    /// Steps the category filter through "All" and every category in use.
    pub fn cycle_category(&mut self) {
        let options = categories(&self.tasks);
        let next = match self.table.category_filter.value() {
            None => options.first().cloned(),
            Some(current) => options
                .iter()
                .position(|c| c == current)
                .and_then(|i| options.get(i + 1))
                .cloned(),
        };
        self.table.category_filter = next.map_or_else(CategoryFilter::all, CategoryFilter::only);
        self.refresh_visible(Local::now());
    }

    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    pub fn start_edit(&mut self, field: InputField) {
        let Some(id) = self.selected_id() else { return };
        let Some(task) = self.tasks.iter().find(|t| t.id == id) else { return };
        self.input_buffer = match field {
            InputField::Name => task.name.clone(),
            InputField::Category => task.category.clone().unwrap_or_default(),
            InputField::Every => task.days_repeat.to_string(),
            _ => String::new(),
        };
        self.target_id = Some(id);
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn start_filter(&mut self) {
        self.input_buffer = self.table.name_filter.clone();
        self.input_field = InputField::Filter;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        if self.input_field == InputField::Filter {
            self.table.name_filter.clear();
            self.refresh_visible(Local::now());
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Handles Enter in an input box.
    pub fn handle_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        match self.input_mode {
            InputMode::Adding => {
                match self.add_state.step {
                    0 => {
                        if input.trim().is_empty() {
                            self.cancel_input();
                            return;
                        }
                        self.add_state.name = input;
                        self.add_state.step = 1;
                    }
                    1 => {
                        self.add_state.category = Some(input).filter(|c| !c.trim().is_empty());
                        self.add_state.step = 2;
                    }
                    _ => {
                        let every = input.trim().parse::<i64>().ok();
                        let name = std::mem::take(&mut self.add_state.name);
                        let category = self.add_state.category.take();
                        match cmd_add(&self.store, name, category, every, false, Utc::now()) {
                            Ok(id) => self.success(format!("Task added (id = {})", id)),
                            Err(e) => self.error("Could not add task", e),
                        }
                        self.input_mode = InputMode::Normal;
                        self.reload();
                    }
                }
            }
            InputMode::Editing => {
                if self.input_field == InputField::Filter {
                    self.table.name_filter = input;
                    self.state.select(Some(0));
                    self.refresh_visible(Local::now());
                } else if let Some(id) = self.target_id.take() {
                    let edit = match self.input_field {
                        InputField::Name => TaskEdit { name: Some(input), ..Default::default() },
                        InputField::Category => TaskEdit { category: Some(input), ..Default::default() },
                        InputField::Every => TaskEdit {
                            // unparsable input clears the goal
                            every: Some(input.trim().parse::<i64>().unwrap_or(0)),
                            ..Default::default()
                        },
                        _ => TaskEdit::default(),
                    };
                    match cmd_edit(&self.store, id, edit) {
                        Ok(task) => self.success(format!("{} updated", task.name)),
                        Err(e) => self.error("Could not update task", e),
                    }
                    self.reload();
                }
                self.input_mode = InputMode::Normal;
                self.input_field = InputField::None;
            }
            InputMode::Normal => {}
        }
    }
}
