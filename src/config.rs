use crate::error::Result;
use log::debug;
use serde::Deserialize;
use std::{fs, path::PathBuf};

const APP_PREFIX: &str = "taskdeck";
const DATABASE: &str = "taskdeck.db";
const CONFIG: &str = "config.toml";
const DEFAULT_SIDEBAR_WIDTH: u16 = 24;

/// User settings read from `$XDG_CONFIG_HOME/taskdeck/config.toml`.
/// Every key is optional.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Config {
    /// Overrides the default database location.
    pub(crate) database: Option<PathBuf>,
    pub(crate) sidebar_width: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: None,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
        }
    }
}

impl Config {
    pub(crate) fn load() -> Result<Config> {
        let dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
        match dirs.find_config_file(CONFIG) {
            Some(path) => {
                debug!("Reading config from {path:?}");
                Self::from_toml(&fs::read_to_string(path)?)
            }
            None => {
                debug!("No config file found, using defaults.");
                Ok(Config::default())
            }
        }
    }

    pub(crate) fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn database_file(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => get_database_file(),
        }
    }
}

fn get_database_file() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
    Ok(dirs.place_state_file(DATABASE)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_toml(
            r#"
database = "/tmp/tasks.db"
sidebar_width = 30
"#,
        )
        .unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/tmp/tasks.db")));
        assert_eq!(config.sidebar_width, 30);
        assert_eq!(
            config.database_file().unwrap(),
            PathBuf::from("/tmp/tasks.db")
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml("sidebar_width = 12").unwrap();
        assert_eq!(config.database, None);
        assert_eq!(config.sidebar_width, 12);
    }

    #[test]
    fn rejects_bad_types() {
        assert!(Config::from_toml("sidebar_width = \"wide\"").is_err());
    }
}
