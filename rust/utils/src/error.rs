use std::{
    backtrace::Backtrace,
    error::Error as StdError,
    fmt::{Debug, Display},
};

/// Broad category of a failure, used by callers that want to react
/// differently to an unreachable backend and a refused request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or backend not reachable / not configured.
    Unavailable,
    /// Backend answered and refused the operation (validation, permission).
    Rejected,
    /// Malformed local input.
    Client,
    /// Everything else: decode failures, encoder failures, bugs.
    Internal,
}

#[derive(Debug)]
pub enum Error {
    Context {
        msg: String,
        source: Box<Error>,
    },
    Unavailable {
        source: Box<dyn StdError + Send + Sync>,
        bt: Backtrace,
    },
    Rejected {
        status: u16,
        msg: String,
    },
    Client {
        msg: String,
        bt: Backtrace,
    },
    Internal {
        source: Box<dyn StdError + Send + Sync>,
        bt: Backtrace,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Context { msg, .. } => write!(f, "{msg}"),
            Error::Unavailable { source, .. } => write!(f, "Backend unavailable: {source}"),
            Error::Rejected { status, msg } => {
                write!(f, "Backend rejected the request ({status}): {msg}")
            }
            Error::Client { msg, .. } => write!(f, "Invalid Request: {msg}"),
            Error::Internal { source, .. } => write!(f, "{source}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Context { source, .. } => Some(source.as_ref()),
            Error::Unavailable { source, .. } => Some(source.as_ref()),
            Error::Internal { source, .. } => Some(source.as_ref()),
            Error::Rejected { .. } | Error::Client { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client {
            msg: msg.into(),
            bt: Backtrace::capture(),
        }
    }

    pub fn rejected(status: u16, msg: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            msg: msg.into(),
        }
    }

    pub fn unavailable(e: impl StdError + Send + Sync + 'static) -> Self {
        Self::Unavailable {
            source: Box::new(e),
            bt: Backtrace::capture(),
        }
    }

    pub fn unavailable_msg(msg: impl Into<String>) -> Self {
        Self::unavailable(StringError(msg.into()))
    }

    pub fn internal(e: impl StdError + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Box::new(e),
            bt: Backtrace::capture(),
        }
    }

    pub fn internal_msg(msg: impl Into<String>) -> Self {
        Self::internal(StringError(msg.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self.without_contexts() {
            Error::Unavailable { .. } => ErrorKind::Unavailable,
            Error::Rejected { .. } => ErrorKind::Rejected,
            Error::Client { .. } => ErrorKind::Client,
            Error::Internal { .. } | Error::Context { .. } => ErrorKind::Internal,
        }
    }

    /// True for failures that happened on the way to or at the backend.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Rejected)
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Client { bt, .. } => Some(bt),
            Error::Internal { bt, .. } => Some(bt),
            Error::Unavailable { bt, .. } => Some(bt),
            Error::Context { source, .. } => source.backtrace(),
            Error::Rejected { .. } => None,
        }
    }

    pub fn without_contexts(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.without_contexts(),
            other => other,
        }
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::internal(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::internal(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::internal(e)
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            Error::unavailable(e)
        } else if let Some(status) = e.status() {
            Error::rejected(status.as_u16(), e.to_string())
        } else {
            Error::internal(e)
        }
    }
}

#[derive(Debug)]
struct StringError(String);

impl Display for StringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for StringError {}

pub trait IntoInternal<T> {
    fn internal(self) -> Result<T>;
}

impl<T, E: StdError + Send + Sync + 'static> IntoInternal<T> for std::result::Result<T, E> {
    fn internal(self) -> Result<T> {
        self.map_err(Error::internal)
    }
}

pub trait ContextExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> ContextExt<T> for Result<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::Context {
            msg: context.into(),
            source: Box::new(e),
        })
    }

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            msg: f().into(),
            source: Box::new(e),
        })
    }
}

impl<T> ContextExt<T> for Option<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::client(context))
    }

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.ok_or_else(|| Error::client(f()))
    }
}

#[macro_export]
macro_rules! client_bail {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        return Err($crate::error::Error::client(format!($fmt $(, $($arg)*)?)))
    };
}

#[macro_export]
macro_rules! client_error {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        $crate::error::Error::client(format!($fmt $(, $($arg)*)?))
    };
}

#[macro_export]
macro_rules! internal_bail {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        return Err($crate::error::Error::internal_msg(format!($fmt $(, $($arg)*)?)))
    };
}

#[macro_export]
macro_rules! internal_error {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        $crate::error::Error::internal_msg(format!($fmt $(, $($arg)*)?))
    };
}
