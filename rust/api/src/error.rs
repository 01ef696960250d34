use thiserror::Error;

pub use congregate_utils::error::ErrorKind;

/// All errors produced by the portal API.
#[derive(Debug, Error)]
pub enum Error {
    /// A table, settings, auth or encoder operation failed.
    #[error(transparent)]
    Core(#[from] congregate_utils::error::Error),

    /// Configuration could not be read or did not match the expected shape.
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid log filter.
    #[error("logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Category of a core failure; `None` for configuration and logging
    /// errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Core(err) => Some(err.kind()),
            Error::Config(_) | Error::Logging(_) => None,
        }
    }

    pub fn logging(msg: impl Into<String>) -> Self {
        Error::Logging(msg.into())
    }
}
