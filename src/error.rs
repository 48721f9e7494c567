//! Error taxonomy for the load pipeline.
//!
//! Nothing in the pipeline catches or retries these: every variant aborts the
//! current file and, transitively, the whole batch.

use rusqlite::ErrorCode;
use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Data root missing or unreadable, or an input file could not be read.
    #[error("filesystem error at '{}': {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON or a missing required field.
    #[error("parse error in '{}'{}: {message}", .path.display(), .line.map(|l| format!(" line {l}")).unwrap_or_default())]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// A unique/foreign-key violation not covered by a conflict policy.
    #[error("constraint violation: {0}")]
    Constraint(#[source] rusqlite::Error),

    /// The database could not be opened or configured.
    #[error("cannot open database '{}': {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Progress lines could not be written to the console.
    #[error("cannot write progress output: {0}")]
    Output(#[source] io::Error),
}

impl EtlError {
    pub fn fs(path: &Path, source: io::Error) -> Self {
        EtlError::FileSystem {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &Path, line: Option<usize>, message: impl Into<String>) -> Self {
        EtlError::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, EtlError::Constraint(_))
    }
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => EtlError::Constraint(err),
            _ => EtlError::Database(err),
        }
    }
}
