use std::{fmt::Display, io::Error as IOError};

#[derive(Debug)]
pub(crate) enum Error {
    Io(IOError),
    Config(String),
    Database(String),
    Bug(String),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Database(msg) => f.write_str(msg),
            Error::Bug(msg) => write!(f, "Bug: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IOError> for Error {
    fn from(value: IOError) -> Self {
        Error::Io(value)
    }
}

impl From<xdg::BaseDirectoriesError> for Error {
    fn from(value: xdg::BaseDirectoriesError) -> Self {
        Error::Config(format!("Could not resolve XDG directories: {value}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Config(format!("Invalid config file: {value}"))
    }
}
