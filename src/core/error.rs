use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Database,
    IndexIo,
    QueryParse,
    Config,
    Corrupted,
    InvalidArgument,
    InvalidState,
    NotFound,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn database(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Database, context.into())
    }

    pub fn index_io(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::IndexIo, context.into())
    }

    pub fn query_parse(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::QueryParse, context.into())
    }

    pub fn config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, context.into())
    }

    /// Prefix the context, keeping the kind. Used to attach
    /// `partition=.. iteration=.. offset=..` to errors raised mid-iteration.
    pub fn with_context(mut self, prefix: impl fmt::Display) -> Self {
        self.context = format!("{}: {}", prefix, self.context);
        self
    }

    /// Only a single query failing to parse is recoverable; everything else
    /// leaves partition state untrustworthy.
    pub fn is_fatal(&self) -> bool {
        self.kind != ErrorKind::QueryParse
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Corrupted,
            context: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error {
            kind: ErrorKind::Database,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Config,
            context: format!("JSON error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
