//! Unified error type for rowkeep.
//!
//! Every failure a record manager can report is funnelled into [`Error`].
//! Callers that only care about the broad category use [`Error::kind`].

use std::fmt;

use crate::types::HandleMode;

/// Broad failure category, stable across error message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A handle could not be opened on the store.
    StoreUnavailable,
    /// The engine rejected a composed statement.
    StatementFault,
    /// Caller-supplied input (identifier, row shape) was rejected before use.
    InvalidInput,
    /// Configuration could not be parsed or is unusable.
    Config,
    /// An I/O operation failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::StoreUnavailable => "store unavailable",
            ErrorKind::StatementFault => "statement fault",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Error type covering all failure modes of the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A handle could not be opened in the requested mode.
    #[error("Store unavailable ({mode}): {source}")]
    StoreUnavailable {
        /// Mode the handle was requested in.
        mode: HandleMode,
        /// The underlying engine error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The engine rejected or failed to run a statement.
    #[error("Statement failed [{sql}]: {source}")]
    Statement {
        /// The SQL text that was executed.
        sql: String,
        /// The underlying engine error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A table or column name is not a plain SQL identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Record data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration problem.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Map this error to its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Error::Statement { .. } => ErrorKind::StatementFault,
            Error::InvalidIdentifier(_) | Error::Validation(_) => ErrorKind::InvalidInput,
            Error::Config(_) => ErrorKind::Config,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// Convenience constructor for [`Error::StoreUnavailable`].
    pub fn store_unavailable(
        mode: HandleMode,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::StoreUnavailable {
            mode,
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Statement`].
    pub fn statement(
        sql: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Statement {
            sql: sql.into(),
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
