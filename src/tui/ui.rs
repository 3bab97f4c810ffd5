use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs},
    Frame,
};

use crate::derive::strip_html;
use crate::derive::timesheet::{billable_total, day_total, week_days, week_total};
use crate::models::{ClientStatus, Priority, TaskStatus};
use crate::notify::Level;
use crate::timer::format_elapsed;
use crate::view::ViewState;

use super::app::{App, InputMode, Tab};

fn header_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn highlight_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray)
}

fn priority_color(p: Priority) -> Color {
    match p {
        Priority::Urgent => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::Cyan,
        Priority::Low => Color::Gray,
    }
}

fn status_color(s: TaskStatus) -> Color {
    match s {
        TaskStatus::Done => Color::Green,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Todo => Color::White,
    }
}

/// Renders the empty-state hint when there is nothing to list. Returns true
/// if it did.
fn empty_state<T>(f: &mut Frame, area: Rect, title: &str, view: &ViewState<T>) -> bool {
    let ViewState::Empty { create_label } = view else { return false };
    let hint = Paragraph::new(format!("Nothing here yet. {create_label}"))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(hint, area);
    true
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .select(app.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(format!("Folio - {}", app.session().display_name())));
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        Tab::MyTasks => render_my_tasks(f, app, chunks[1]),
        Tab::Board => render_board(f, app, chunks[1]),
        Tab::Clients => render_clients(f, app, chunks[1]),
        Tab::Ideas => render_ideas(f, app, chunks[1]),
        Tab::Time => render_time(f, app, chunks[1]),
        Tab::Performance => render_performance(f, app, chunks[1]),
    }

    render_status(f, app, chunks[2]);

    if app.input_mode == InputMode::Dialog {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(app.dialog_prompt().unwrap_or_default()));
        f.render_widget(input, area);
    }
}

fn render_my_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let view = ViewState::resolve(false, app.my_task_rows(), "Add tasks to a project with `folio tasks add`.");
    if empty_state(f, area, "My Tasks", &view) {
        return;
    }
    let ViewState::Ready(rows) = view else { return };
    let rows: Vec<Row> = rows
        .into_iter()
        .map(|(bucket, pt)| {
            let bucket_color = match bucket {
                "Overdue" => Color::Red,
                "Today" => Color::Yellow,
                "Completed" => Color::Green,
                _ => Color::White,
            };
            Row::new(vec![
                Cell::from(bucket).style(Style::default().fg(bucket_color)),
                Cell::from(pt.task.name.clone()),
                Cell::from(strip_html(&pt.project_name)),
                Cell::from(pt.task.assignee.clone()),
                Cell::from(pt.task.status.label()).style(Style::default().fg(status_color(pt.task.status))),
                Cell::from(pt.priority().to_string()).style(Style::default().fg(priority_color(pt.priority()))),
                Cell::from(pt.due_day().to_string()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(10),
        Constraint::Min(20),
        Constraint::Length(20),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(11),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["When", "Task", "Project", "Assignee", "Status", "Priority", "Due"])
                .style(header_style())
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("My Tasks"))
        .row_highlight_style(highlight_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_board(f: &mut Frame, app: &mut App, area: Rect) {
    let columns = app.board_columns();
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
        .split(area);
    for (idx, ((status, tasks), column_area)) in columns.into_iter().zip(areas.iter()).enumerate() {
        let active = idx == app.board_column;
        let rows: Vec<Row> = tasks
            .iter()
            .map(|pt| {
                Row::new(vec![Cell::from(vec![
                    Line::from(pt.task.name.clone()).style(Style::default().fg(priority_color(pt.priority()))),
                    Line::from(format!("{} · {}", strip_html(&pt.project_name), pt.task.assignee))
                        .style(Style::default().fg(Color::Gray)),
                ])])
                .height(2)
            })
            .collect();
        let border = if active { Style::default().fg(Color::Yellow) } else { Style::default() };
        let table = Table::new(rows, [Constraint::Percentage(100)])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!("{} ({})", status.label(), tasks.len())),
            )
            .row_highlight_style(highlight_style());
        if active {
            f.render_stateful_widget(table, *column_area, &mut app.state);
        } else {
            f.render_widget(table, *column_area);
        }
    }
}

fn render_clients(f: &mut Frame, app: &mut App, area: Rect) {
    let view = ViewState::resolve(false, app.clients.items().to_vec(), "Press 'a' to add a client.");
    if empty_state(f, area, "Clients", &view) {
        return;
    }
    let ViewState::Ready(clients) = view else { return };
    let rows: Vec<Row> = clients
        .iter()
        .map(|c| {
            let color = match c.status {
                ClientStatus::Active => Color::Green,
                ClientStatus::Lead => Color::Yellow,
                ClientStatus::Inactive => Color::Gray,
            };
            Row::new(vec![
                Cell::from(c.name.clone()),
                Cell::from(c.company.clone()),
                Cell::from(c.email.clone()),
                Cell::from(c.phone.clone().unwrap_or_default()),
                Cell::from(c.status.to_string()).style(Style::default().fg(color)),
                Cell::from(c.project_count.to_string()),
                Cell::from(format!("${:.0}", c.total_value.unwrap_or(0.0))),
            ])
        })
        .collect();
    let widths = [
        Constraint::Min(16),
        Constraint::Length(20),
        Constraint::Length(26),
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Name", "Company", "Email", "Phone", "Status", "Projects", "Value"])
                .style(header_style())
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Clients"))
        .row_highlight_style(highlight_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_ideas(f: &mut Frame, app: &mut App, area: Rect) {
    let view = ViewState::resolve(false, app.ideas.items().to_vec(), "Press 'a' to capture an idea.");
    if empty_state(f, area, "Ideas", &view) {
        return;
    }
    let ViewState::Ready(ideas) = view else { return };
    let rows: Vec<Row> = ideas
        .iter()
        .map(|i| {
            Row::new(vec![
                Cell::from(i.title.clone()),
                Cell::from(i.description.clone()),
                Cell::from(i.created_at.format("%Y-%m-%d").to_string()),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(30), Constraint::Min(20), Constraint::Length(11)])
        .header(Row::new(vec!["Title", "Description", "Created"]).style(header_style()).bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Ideas"))
        .row_highlight_style(highlight_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_time(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let timer_text = match app.timer.project_name() {
        Some(name) => format!("Tracking {name}  {}", format_elapsed(app.timer.elapsed_secs(Utc::now()))),
        None => format!(
            "Timer stopped. Project: {}",
            app.timer_project_name().unwrap_or_else(|| "(no projects)".to_string())
        ),
    };
    let timer = Paragraph::new(timer_text)
        .style(Style::default().fg(if app.timer.is_running() { Color::Green } else { Color::Gray }))
        .block(Block::default().borders(Borders::ALL).title("Timer"));
    f.render_widget(timer, chunks[0]);

    let entries: Vec<_> = app.week_entries().into_iter().cloned().collect();
    let view = ViewState::resolve(false, entries, "Press 's' to start the timer.");
    if !empty_state(f, chunks[1], "This week", &view) {
        if let ViewState::Ready(entries) = view {
            let rows: Vec<Row> = entries
                .iter()
                .map(|e| {
                    Row::new(vec![
                        Cell::from(e.date.format("%a %d").to_string()),
                        Cell::from(strip_html(&e.project_name)),
                        Cell::from(e.description.clone()),
                        Cell::from(format!("{:.2}", e.hours)),
                        Cell::from(if e.billable { "yes" } else { "no" }),
                    ])
                })
                .collect();
            let widths = [
                Constraint::Length(7),
                Constraint::Length(24),
                Constraint::Min(20),
                Constraint::Length(6),
                Constraint::Length(8),
            ];
            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Day", "Project", "Description", "Hours", "Billable"]).style(header_style()))
                .block(Block::default().borders(Borders::ALL).title("This week"))
                .row_highlight_style(highlight_style())
                .highlight_symbol(">> ");
            f.render_stateful_widget(table, chunks[1], &mut app.state);
        }
    }

    let all = app.entries.items();
    let days = week_days(app.today);
    let totals: Vec<String> = days
        .iter()
        .map(|d| format!("{} {:.1}", d.format("%a"), day_total(all, *d)))
        .collect();
    let summary = Paragraph::new(vec![
        Line::from(totals.join("  ")),
        Line::from(format!(
            "Week {:.2}h  Billable {:.2}h  (${:.0})",
            week_total(all, app.today),
            billable_total(all, app.today),
            billable_total(all, app.today) * app.hourly_rate()
        )),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(summary, chunks[2]);
}

fn render_performance(f: &mut Frame, app: &mut App, area: Rect) {
    let s = app.performance();
    if s.total_projects == 0 {
        let hint = Paragraph::new("No projects yet. Create one with `folio projects add <title>`.")
            .block(Block::default().borders(Borders::ALL).title("Performance"));
        f.render_widget(hint, area);
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let points = |data: &[crate::derive::ChartPoint]| {
        data.iter().map(|p| format!("{} {}", p.name, p.value)).collect::<Vec<_>>().join("  ")
    };
    let summary = Paragraph::new(vec![
        Line::from(format!(
            "Projects {} (completed {}, active {})  Tasks {} (done {})",
            s.total_projects, s.completed_projects, s.active_projects, s.total_tasks, s.completed_tasks
        )),
        Line::from(format!(
            "Avg progress {}%  Completion {}%  Task completion {}%",
            s.avg_progress, s.completion_rate, s.task_completion_rate
        )),
        Line::from(format!("Status: {}", points(&s.status_data))),
        Line::from(format!("Priority: {}", points(&s.priority_data))),
    ])
    .block(Block::default().borders(Borders::ALL).title("Performance"));
    f.render_widget(summary, chunks[0]);

    let rows: Vec<Row> = s
        .progress_data
        .iter()
        .map(|r| {
            let filled = usize::from(r.progress) / 5;
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(format!("{}{} {}%", "█".repeat(filled), "░".repeat(20 - filled), r.progress)),
                Cell::from(r.tasks.to_string()),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(24), Constraint::Length(26), Constraint::Length(6)])
        .header(Row::new(vec!["Project", "Progress", "Tasks"]).style(header_style()))
        .block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(table, chunks[1]);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let help = match (app.input_mode, app.tab) {
        (InputMode::Dialog, _) => "Enter: Next field / Save | Esc: Cancel",
        (_, Tab::MyTasks) => "q: Quit | Tab: Switch | j/k: Move | Space: Done | d: Del | r: Reload",
        (_, Tab::Board) => "q: Quit | Tab: Switch | h/l: Column | </>: Move card | Space: Done | d: Del",
        (_, Tab::Clients) | (_, Tab::Ideas) => "q: Quit | Tab: Switch | a: Add | e: Edit | d: Del | r: Reload",
        (_, Tab::Time) => "q: Quit | Tab: Switch | s: Start/Stop timer | p: Timer project | d: Del",
        (_, Tab::Performance) => "q: Quit | Tab: Switch | r: Reload",
    };
    let line = match app.last_notice() {
        Some(n) => {
            let color = if n.level == Level::Error { Color::Red } else { Color::Green };
            Line::from(format!("{}  |  {help}", n.message)).style(Style::default().fg(color))
        }
        None => Line::from(help).style(Style::default().fg(Color::Gray)),
    };
    f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(margin), Constraint::Length(height), Constraint::Length(margin)])
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
