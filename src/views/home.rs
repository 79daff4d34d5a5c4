use std::collections::HashSet;

use crate::{
    commands::{parse_command, Command},
    config::Config,
    db::Db,
    error::Result,
    types::{Subtask, Task, TaskFilter, TaskId},
};
use log::{debug, warn};
use ratatui::{
    prelude::*,
    style::Style,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Row, Table},
    Frame,
};
use tui_textarea::{Input, Key, TextArea};

use super::{toggle_subtask, AppState};

/// Everything the home screen shows. Reloaded in full after every mutation.
pub(crate) struct Home {
    sidebar: Vec<TaskFilter>,
    filter: TaskFilter,
    tasks: Vec<Task>,
    subtasks: Vec<Subtask>,
    status: String,
}

impl Home {
    pub(crate) fn new(db: &Db) -> Result<Home> {
        let mut home = Home {
            sidebar: vec![TaskFilter::All],
            filter: TaskFilter::All,
            tasks: Vec::new(),
            subtasks: Vec::new(),
            status: String::from("Type a command, e.g. task Work; Write report; ; high"),
        };
        home.reload(db)?;
        Ok(home)
    }

    pub(crate) fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    fn selected(&self) -> usize {
        self.sidebar
            .iter()
            .position(|f| *f == self.filter)
            .unwrap_or(0)
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub(crate) fn reload(&mut self, db: &Db) -> Result<()> {
        let current = self.filter().clone();
        self.show(db, current)
    }

    /// Rebuilds the sidebar and selects `filter`, falling back to "All" when
    /// that category no longer has any tasks.
    fn show(&mut self, db: &Db, filter: TaskFilter) -> Result<()> {
        self.sidebar = std::iter::once(TaskFilter::All)
            .chain(db.categories()?.into_iter().map(TaskFilter::Category))
            .collect();
        self.filter = if self.sidebar.contains(&filter) {
            filter
        } else {
            TaskFilter::All
        };

        let tasks = match &self.filter {
            TaskFilter::All => db.list_tasks()?,
            TaskFilter::Category(category) => db.tasks_in_category(category)?,
        };
        let visible: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
        self.subtasks = db
            .list_subtasks()?
            .into_iter()
            .filter(|s| visible.contains(&s.task_id))
            .collect();
        self.tasks = tasks;
        debug!(
            "Showing {} tasks and {} subtasks for {}",
            self.tasks.len(),
            self.subtasks.len(),
            self.filter()
        );
        Ok(())
    }

    fn select(&mut self, db: &Db, index: usize) -> Result<()> {
        let filter = self
            .sidebar
            .get(index)
            .cloned()
            .unwrap_or(TaskFilter::All);
        self.show(db, filter)
    }

    pub(crate) fn next_category(&mut self, db: &Db) -> Result<()> {
        let len = self.sidebar.len().max(1);
        self.select(db, (self.selected() + 1) % len)
    }

    pub(crate) fn previous_category(&mut self, db: &Db) -> Result<()> {
        let len = self.sidebar.len().max(1);
        self.select(db, (self.selected() + len - 1) % len)
    }

    pub(crate) fn execute(&mut self, db: &Db, command: Command) -> Result<AppState> {
        debug!("Executing {command:?}");
        match command {
            Command::AddTask(task) => {
                let task = db.create_task(&task)?;
                self.set_status(format!("Created TSK-{}", task.id));
                let filter = if task.category.is_empty() {
                    TaskFilter::All
                } else {
                    TaskFilter::Category(task.category)
                };
                self.show(db, filter)?;
            }
            Command::AddSubtask(subtask) => match db.create_subtask(&subtask)? {
                Some(subtask) => {
                    self.set_status(format!("Added SUB-{} to TSK-{}", subtask.id, subtask.task_id));
                    self.reload(db)?;
                }
                None => self.set_status(format!("No task TSK-{}", subtask.task_id)),
            },
            Command::EditTask(task_id, update) => match db.update_task(task_id, &update)? {
                Some(_) => {
                    self.set_status(format!("Updated TSK-{task_id}"));
                    self.reload(db)?;
                }
                None => self.set_status(format!("No task TSK-{task_id}")),
            },
            Command::EditSubtask(subtask_id, update) => {
                match db.update_subtask(subtask_id, &update)? {
                    Some(_) => {
                        self.set_status(format!("Updated SUB-{subtask_id}"));
                        self.reload(db)?;
                    }
                    None => self.set_status(format!("No subtask SUB-{subtask_id}")),
                }
            }
            Command::ToggleSubtask(subtask_id) => match toggle_subtask(db, subtask_id)? {
                Some(subtask) => {
                    self.set_status(subtask.to_string());
                    self.reload(db)?;
                }
                None => self.set_status(format!("No subtask SUB-{subtask_id}")),
            },
            Command::DeleteTask(task_id) => {
                if db.delete_task(task_id)? {
                    self.set_status(format!("Deleted TSK-{task_id}"));
                    self.reload(db)?;
                } else {
                    self.set_status(format!("No task TSK-{task_id}"));
                }
            }
            Command::DeleteSubtask(subtask_id) => {
                if db.delete_subtask(subtask_id)? {
                    self.set_status(format!("Deleted SUB-{subtask_id}"));
                    self.reload(db)?;
                } else {
                    self.set_status(format!("No subtask SUB-{subtask_id}"));
                }
            }
            Command::Open(task_id) => {
                if db.get_task(task_id)?.is_some() {
                    return Ok(AppState::Details(task_id));
                }
                self.set_status(format!("No task TSK-{task_id}"));
            }
            Command::Quit => return Ok(AppState::Exit),
        }
        Ok(AppState::Home)
    }

    fn draw(&self, frame: &mut Frame, editor: &TextArea, sidebar_width: u16) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(sidebar_width), Constraint::Min(20)])
            .split(frame.size());
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(55),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(columns[1]);

        let categories = List::new(
            self.sidebar
                .iter()
                .map(|f| ListItem::new(f.to_string()))
                .collect::<Vec<_>>(),
        )
        .block(Block::default().title("categories").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.selected()));
        frame.render_stateful_widget(categories, columns[0], &mut state);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let tasks = Table::new(
            self.tasks.iter().map(|t| {
                Row::new(vec![
                    t.id.to_string(),
                    t.category.clone(),
                    t.name.clone(),
                    t.detail.clone().unwrap_or_default(),
                    t.priority.map(|p| p.to_string()).unwrap_or_default(),
                    t.assignee.clone().unwrap_or_default(),
                ])
            }),
            [
                Constraint::Length(6),
                Constraint::Length(14),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Length(8),
                Constraint::Length(12),
            ],
        )
        .header(
            Row::new(vec!["ID", "Category", "Name", "Detail", "Priority", "Assignee"]).style(bold),
        )
        .block(
            Block::default()
                .title(format!("tasks ({})", self.filter()))
                .borders(Borders::ALL),
        );
        frame.render_widget(tasks, rows[0]);

        let subtasks = Table::new(
            self.subtasks.iter().map(|s| {
                Row::new(vec![
                    s.id.to_string(),
                    s.task_id.to_string(),
                    s.name.clone(),
                    s.detail.clone().unwrap_or_default(),
                    s.initiated.to_string(),
                    s.completed.to_string(),
                ])
            }),
            [
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
                Constraint::Length(10),
                Constraint::Length(10),
            ],
        )
        .header(
            Row::new(vec!["ID", "Task", "Name", "Detail", "Initiated", "Completed"]).style(bold),
        )
        .block(Block::default().title("subtasks").borders(Borders::ALL));
        frame.render_widget(subtasks, rows[1]);

        frame.render_widget(editor.widget(), rows[2]);
        frame.render_widget(
            Paragraph::new(self.status.as_str()).style(Style::default().fg(Color::Yellow)),
            rows[3],
        );
    }
}

fn command_editor() -> TextArea<'static> {
    let mut editor = TextArea::default();
    editor.set_cursor_line_style(Style::default());
    editor.set_placeholder_text("Enter a command...");
    editor.set_style(Style::default().fg(Color::White));
    editor.set_block(Block::default().borders(Borders::ALL).title("command"));
    editor
}

pub(crate) fn render_home<B>(
    term: &mut Terminal<B>,
    db: &Db,
    config: &Config,
    home: &mut Home,
) -> Result<AppState>
where
    B: Backend,
{
    let mut editor = command_editor();
    loop {
        term.draw(|frame| home.draw(frame, &editor, config.sidebar_width))?;
        match crossterm::event::read()?.into() {
            Input { key: Key::Esc, .. }
            | Input {
                key: Key::Char('q'),
                ctrl: true,
                ..
            } => return Ok(AppState::Exit),
            Input { key: Key::Up, .. } => home.previous_category(db)?,
            Input { key: Key::Down, .. } => home.next_category(db)?,
            Input {
                key: Key::Enter, ..
            } => {
                let line = editor.lines().join(" ");
                editor = command_editor();
                let next = match parse_command(&line) {
                    Ok(command) => home.execute(db, command)?,
                    Err(e) => {
                        warn!("Could not parse {line:?}: {e}");
                        home.set_status(e.to_string());
                        AppState::Home
                    }
                };
                if !matches!(next, AppState::Home) {
                    return Ok(next);
                }
            }
            input => {
                editor.input(input);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewSubtask, NewTask, SubtaskUpdate, TaskUpdate};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Db, Home) {
        let dir = TempDir::new().unwrap();
        let db = Db::open(dir.path().join("tasks.db")).unwrap();
        let home = Home::new(&db).unwrap();
        (dir, db, home)
    }

    fn run(home: &mut Home, db: &Db, line: &str) -> AppState {
        home.execute(db, parse_command(line).unwrap()).unwrap()
    }

    #[test]
    fn starts_with_all() {
        let (_dir, _db, home) = setup();
        assert_eq!(home.sidebar, vec![TaskFilter::All]);
        assert_eq!(home.filter(), &TaskFilter::All);
        assert!(home.tasks.is_empty());
    }

    #[test]
    fn adding_a_task_selects_its_category() {
        let (_dir, db, mut home) = setup();
        run(&mut home, &db, "task Home; Dishes");
        run(&mut home, &db, "task Work; Report; ; high");

        assert_eq!(
            home.sidebar,
            vec![
                TaskFilter::All,
                TaskFilter::Category("Home".to_string()),
                TaskFilter::Category("Work".to_string()),
            ]
        );
        assert_eq!(home.filter(), &TaskFilter::Category("Work".to_string()));
        assert_eq!(home.tasks.len(), 1);
        assert_eq!(home.tasks[0].name, "Report");
    }

    #[test]
    fn sidebar_navigation_filters_tasks() {
        let (_dir, db, mut home) = setup();
        db.create_task(&NewTask::new("Home", "Dishes")).unwrap();
        db.create_task(&NewTask::new("Work", "Report")).unwrap();
        home.reload(&db).unwrap();
        assert_eq!(home.tasks.len(), 2);

        home.next_category(&db).unwrap();
        assert_eq!(home.filter(), &TaskFilter::Category("Home".to_string()));
        assert_eq!(home.tasks.len(), 1);

        home.previous_category(&db).unwrap();
        home.previous_category(&db).unwrap();
        assert_eq!(home.filter(), &TaskFilter::Category("Work".to_string()));
        assert_eq!(home.tasks[0].name, "Report");
    }

    #[test]
    fn subtasks_follow_visible_tasks() {
        let (_dir, db, mut home) = setup();
        let home_task = db.create_task(&NewTask::new("Home", "Dishes")).unwrap();
        let work_task = db.create_task(&NewTask::new("Work", "Report")).unwrap();
        db.create_subtask(&NewSubtask::new(home_task.id, "Soap"))
            .unwrap();
        db.create_subtask(&NewSubtask::new(work_task.id, "Charts"))
            .unwrap();
        home.reload(&db).unwrap();
        assert_eq!(home.subtasks.len(), 2);

        home.next_category(&db).unwrap();
        assert_eq!(home.subtasks.len(), 1);
        assert_eq!(home.subtasks[0].name, "Soap");
    }

    #[test]
    fn missing_parent_only_sets_status() {
        let (_dir, db, mut home) = setup();
        run(&mut home, &db, "sub 12; Orphan");
        assert_eq!(home.status, "No task TSK-12");
        assert!(db.list_subtasks().unwrap().is_empty());
    }

    #[test]
    fn edits_and_toggles_subtasks() {
        let (_dir, db, mut home) = setup();
        let task = db.create_task(&NewTask::new("Home", "Dishes")).unwrap();
        run(&mut home, &db, &format!("sub {}; Soap", task.id));
        let subtask_id = home.subtasks[0].id;

        run(&mut home, &db, &format!("done {subtask_id}"));
        assert!(home.subtasks[0].completed);
        run(&mut home, &db, &format!("toggle {subtask_id}"));
        assert!(!home.subtasks[0].completed);
        run(&mut home, &db, &format!("subedit {subtask_id} name Dish soap"));
        assert_eq!(home.subtasks[0].name, "Dish soap");

        let missing = home
            .execute(
                &db,
                Command::EditSubtask(
                    999,
                    SubtaskUpdate {
                        completed: Some(true),
                        ..Default::default()
                    },
                ),
            )
            .unwrap();
        assert!(matches!(missing, AppState::Home));
        assert_eq!(home.status, "No subtask SUB-999");
    }

    #[test]
    fn recategorizing_last_task_falls_back_to_all() {
        let (_dir, db, mut home) = setup();
        run(&mut home, &db, "task Home; Dishes");
        let task_id = home.tasks[0].id;
        home.execute(
            &db,
            Command::EditTask(
                task_id,
                TaskUpdate {
                    category: Some("Chores".to_string()),
                    ..Default::default()
                },
            ),
        )
        .unwrap();
        assert_eq!(home.filter(), &TaskFilter::All);
        assert_eq!(home.tasks[0].category, "Chores");
    }

    #[test]
    fn delete_task_removes_its_subtasks_from_view() {
        let (_dir, db, mut home) = setup();
        run(&mut home, &db, "task Home; Dishes");
        let task_id = home.tasks[0].id;
        run(&mut home, &db, &format!("sub {task_id}; Soap"));
        assert_eq!(home.subtasks.len(), 1);

        run(&mut home, &db, &format!("del {task_id}"));
        assert!(home.tasks.is_empty());
        assert!(home.subtasks.is_empty());
        assert_eq!(home.sidebar, vec![TaskFilter::All]);

        run(&mut home, &db, &format!("del {task_id}"));
        assert_eq!(home.status, format!("No task TSK-{task_id}"));
    }

    #[test]
    fn open_and_quit_change_state() {
        let (_dir, db, mut home) = setup();
        run(&mut home, &db, "task Home; Dishes");
        let task_id = home.tasks[0].id;
        assert!(matches!(
            run(&mut home, &db, &format!("open {task_id}")),
            AppState::Details(id) if id == task_id
        ));
        assert!(matches!(run(&mut home, &db, "open 404"), AppState::Home));
        assert!(matches!(run(&mut home, &db, "quit"), AppState::Exit));
    }
}
