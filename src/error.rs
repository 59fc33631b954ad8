// Error kinds surfaced at the provider boundary.
use crate::model::parser::TokenKind;
use std::path::PathBuf;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Flat classification of every failure the provider can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ErrorKind {
    IoOpenFailure,
    IoReadFailure,
    IoWriteFailure,
    WatchSetupFailure,
    InvalidDate,
    MissingListName,
    MissingTitle,
    MisplacedToken,
    UnrecognizedToken,
    InvalidRequest,
}

/// Why a single Todo.txt line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid date '{token}'")]
    InvalidDate { token: String },

    #[error("line has no @list")]
    MissingListName,

    #[error("task line has no title")]
    MissingTitle,

    #[error("{kind} token '{token}' at position {position} is out of place")]
    MisplacedToken {
        kind: TokenKind,
        token: String,
        position: usize,
    },

    #[error("unrecognized token '{token}'")]
    UnrecognizedToken { token: String },

    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::InvalidDate { .. } => ErrorKind::InvalidDate,
            ParseError::MissingListName => ErrorKind::MissingListName,
            ParseError::MissingTitle => ErrorKind::MissingTitle,
            ParseError::MisplacedToken { .. } => ErrorKind::MisplacedToken,
            ParseError::UnrecognizedToken { .. } => ErrorKind::UnrecognizedToken,
            ParseError::InvalidEncoding => ErrorKind::IoReadFailure,
        }
    }

    /// Short user-facing headline for the notification sink.
    pub fn summary(&self) -> &'static str {
        match self {
            ParseError::InvalidDate { .. } => "Incorrect date",
            ParseError::MissingListName => "No task list found for some tasks",
            ParseError::MissingTitle => "Task without a title in Todo.txt",
            ParseError::MisplacedToken { .. } => "Malformed Todo.txt line",
            ParseError::UnrecognizedToken { .. } => "Unrecognized token in a Todo.txt line",
            ParseError::InvalidEncoding => "Error reading tasks from Todo.txt",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("cannot open {}: {source}", path.display())]
    IoOpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    IoReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    IoWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot watch {}: {source}", path.display())]
    WatchSetupFailure {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// One rejected line of the file; the rest of the file still loads.
    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("{0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::IoOpenFailure { .. } => ErrorKind::IoOpenFailure,
            ProviderError::IoReadFailure { .. } => ErrorKind::IoReadFailure,
            ProviderError::IoWriteFailure { .. } => ErrorKind::IoWriteFailure,
            ProviderError::WatchSetupFailure { .. } => ErrorKind::WatchSetupFailure,
            ProviderError::Parse { source, .. } => source.kind(),
            ProviderError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ProviderError::IoOpenFailure { .. } => "Error opening Todo.txt",
            ProviderError::IoReadFailure { .. } => "Error reading tasks from Todo.txt",
            ProviderError::IoWriteFailure { .. } => "Error saving Todo.txt",
            ProviderError::WatchSetupFailure { .. } => "Cannot watch Todo.txt for changes",
            ProviderError::Parse { source, .. } => source.summary(),
            ProviderError::InvalidRequest(_) => "Invalid Todo.txt operation",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ProviderError::InvalidRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
