mod commands;
mod config;
mod db;
mod error;
mod types;
mod views;
use crate::error::Result;
use crate::views::{details::render_details, home::render_home, home::Home, AppState};
use crate::{config::Config, db::Db};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::{debug, info};
use ratatui::prelude::{Backend, CrosstermBackend, Terminal};
use std::io::stdout;

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    db: &Db,
    config: &Config,
    home: &mut Home,
) -> Result<()> {
    let mut next = AppState::Home;
    loop {
        match next {
            AppState::Home => next = render_home(terminal, db, config, home)?,
            AppState::Details(task_id) => next = render_details(terminal, db, home, task_id)?,
            AppState::Exit => break,
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load()?;
    let db_path = config.database_file()?;
    debug!("Initializing db...");
    let db = Db::open(&db_path)?;
    info!("Using database {db_path:?}");
    let mut home = Home::new(&db)?;

    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let result = run(&mut terminal, &db, &config, &mut home);

    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;

    result
}
