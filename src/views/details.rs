use chrono::{DateTime, Local, Utc};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tui_textarea::{Input, Key};

use crate::{
    db::Db,
    error::Result,
    types::{Subtask, Task, TaskId},
};

use super::{home::Home, toggle_subtask, AppState};

fn local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn draw(frame: &mut Frame, task: &Task, subtasks: &[Subtask], selected: Option<usize>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(3), Constraint::Length(1)])
        .split(frame.size());

    let lines = vec![
        field("Category: ", task.category.clone()),
        field(
            "Priority: ",
            task.priority.map(|p| p.to_string()).unwrap_or_default(),
        ),
        field("Assignee: ", task.assignee.clone().unwrap_or_default()),
        field("Created:  ", local(&task.created)),
        field("Updated:  ", local(&task.updated)),
        Line::from(""),
        Line::from(task.detail.clone().unwrap_or_default()),
    ];
    let header = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!("TSK-{} {}", task.id, task.name))
                .borders(Borders::ALL),
        );
    frame.render_widget(header, chunks[0]);

    let list = List::new(
        subtasks
            .iter()
            .map(|s| {
                ListItem::new(format!(
                    "{s}  (added {}, changed {})",
                    local(&s.created),
                    local(&s.updated)
                ))
            })
            .collect::<Vec<_>>(),
    )
    .block(Block::default().title("subtasks").borders(Borders::ALL))
    .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
    .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, chunks[1], &mut state);

    frame.render_widget(
        Paragraph::new("space: toggle completed  esc: back")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

/// Shows one task and its subtasks until the user goes back.
pub(crate) fn render_details<B: Backend>(
    term: &mut Terminal<B>,
    db: &Db,
    home: &mut Home,
    task_id: TaskId,
) -> Result<AppState> {
    let mut selected = 0usize;
    loop {
        let Some(task) = db.get_task(task_id)? else {
            home.set_status(format!("No task TSK-{task_id}"));
            home.reload(db)?;
            return Ok(AppState::Home);
        };
        let subtasks = db.subtasks_of(task_id)?;
        selected = selected.min(subtasks.len().saturating_sub(1));
        let highlighted = (!subtasks.is_empty()).then_some(selected);
        term.draw(|frame| draw(frame, &task, &subtasks, highlighted))?;

        match crossterm::event::read()?.into() {
            Input { key: Key::Esc, .. }
            | Input {
                key: Key::Char('q'),
                ..
            } => {
                home.reload(db)?;
                return Ok(AppState::Home);
            }
            Input { key: Key::Up, .. } => selected = selected.saturating_sub(1),
            Input { key: Key::Down, .. } => selected += 1,
            Input {
                key: Key::Char(' '),
                ..
            } => {
                if let Some(subtask) = subtasks.get(selected) {
                    debug!("Toggling SUB-{} from details", subtask.id);
                    toggle_subtask(db, subtask.id)?;
                }
            }
            _ => {}
        }
    }
}
