use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputField, InputMode, Message};
use crate::models::Theme;
use crate::status::will_send_email_reminder;
use crate::table::{Column, Direction as SortDirection, TaskTable};

struct Palette {
    header: Color,
    muted: Color,
    late: Color,
    highlight_bg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            header: Color::Blue,
            muted: Color::DarkGray,
            late: Color::Red,
            highlight_bg: Color::Gray,
        },
        Theme::Dark | Theme::System => Palette {
            header: Color::Cyan,
            muted: Color::Gray,
            late: Color::LightRed,
            highlight_bg: Color::DarkGray,
        },
    }
}

fn header_label(app: &App, column: Column) -> String {
    match app.table.sorting {
        Some(s) if s.column == column => {
            let arrow = match s.direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            };
            format!("{} {}", column.header(), arrow)
        }
        _ => column.header().to_string(),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Help / message
        ])
        .split(f.area());

    let colors = palette(app.settings.theme);
    // one instant for the whole frame
    let now = Local::now();
    app.refresh_visible(now);

    let rows = app.rows(now);
    let title = format!(
        "Long Habit - {} | filter: {}",
        app.table.category_filter,
        if app.table.name_filter.is_empty() { "-" } else { app.table.name_filter.as_str() }
    );

    if rows.is_empty() {
        let empty = Paragraph::new(TaskTable::empty_message(app.tasks.len()))
            .alignment(Alignment::Center)
            .style(Style::default().fg(colors.muted))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, chunks[0]);
    } else {
        let table_rows: Vec<Row> = rows
            .iter()
            .map(|r| {
                let goal_style = if r.task.goal().is_active() {
                    Style::default()
                } else {
                    Style::default().fg(colors.muted)
                };
                let envelope = if will_send_email_reminder(&app.settings, r.task) { " ✉" } else { "" };
                let name = Text::from(vec![
                    Line::from(r.task.name.clone()),
                    Line::styled(format!("{}{}", r.goal_label, envelope), goal_style),
                ]);
                let days_style = if r.status.task_is_late {
                    Style::default().fg(colors.late)
                } else {
                    Style::default()
                };
                let status = Text::from(vec![
                    Line::styled(r.status.date_text.clone(), Style::default().fg(colors.muted)),
                    Line::styled(r.status.days_text.clone(), days_style),
                ])
                .alignment(Alignment::Right);
                Row::new(vec![
                    Cell::from(r.cell(Column::Done)),
                    Cell::from(name),
                    Cell::from(r.task.category.clone().unwrap_or_default()),
                    Cell::from(status),
                ])
                .height(2)
            })
            .collect();

        let widths = [
            Constraint::Length(4),
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(18),
        ];

        let header = Row::new(vec![
            header_label(app, Column::Done),
            header_label(app, Column::Name),
            "Category".to_string(),
            header_label(app, Column::Status),
        ])
        .style(Style::default().fg(colors.header).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

        let table = Table::new(table_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(colors.highlight_bg))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[0], &mut app.state);
    }

    let footer = match (&app.input_mode, &app.message) {
        (InputMode::Normal, Some(Message::Success(text))) => {
            Paragraph::new(text.as_str()).style(Style::default().fg(Color::Green))
        }
        (InputMode::Normal, Some(Message::Error(text))) => {
            Paragraph::new(text.as_str()).style(Style::default().fg(colors.late))
        }
        (InputMode::Normal, None) => Paragraph::new(
            "q: Quit | a: Add | Space: Done | z: Undo | x: Check | D: Done checked | n: Name | c: Category | g: Goal | /: Search | f: Category filter | s/o: Sort status/name | d: Del",
        )
        .style(Style::default().fg(colors.muted)),
        (InputMode::Editing, _) => Paragraph::new("Enter: Save | Esc: Cancel").style(Style::default().fg(colors.muted)),
        (InputMode::Adding, _) => Paragraph::new("Enter: Next Step | Esc: Cancel").style(Style::default().fg(colors.muted)),
    };
    f.render_widget(footer.block(Block::default().borders(Borders::ALL)), chunks[1]);

    // Render Input Box if needed
    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => match app.add_state.step {
                0 => "Add Task: Enter Name",
                1 => "Add Task: Enter Category (Optional)",
                _ => "Add Task: Repeat every N days (Optional)",
            },
            _ => match app.input_field {
                InputField::Name => "Edit Name",
                InputField::Category => "Edit Category (empty clears)",
                InputField::Every => "Edit Goal (days, 0 for none)",
                InputField::Filter => "Search tasks",
                InputField::None => "Edit",
            },
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
