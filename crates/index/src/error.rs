//! Index Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The display strings of `Config` and
//! `Open` are part of the public contract; callers match on them.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid construction arguments. Checked before storage is touched.
    #[display("Must specify a nonzero max_size")]
    Config,
    /// The backing file could not be opened or created at the given path.
    #[display("unable to open database file")]
    Open(#[error(not(source))] PathBuf),
    /// The storage engine failed to execute a statement. Carries the engine's
    /// diagnostic text verbatim.
    #[display("{_0}")]
    Backend(#[error(not(source))] String),
    /// A value does not fit between Rust and SQLite integer representations.
    #[display("invalid index data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Wrap a storage engine failure, keeping the `sqlx` error as the child
    /// frame of the error tree.
    #[track_caller]
    pub(crate) fn backend(err: sqlx::Error) -> Error {
        let message = match &err {
            sqlx::Error::Database(db) => db.message().to_string(),
            other => other.to_string(),
        };
        exn::Exn::new(err).raise(ErrorKind::Backend(message))
    }

    /// Returns `true` if retrying might succeed.
    ///
    /// Only engine failures qualify (a busy or locked database may clear up).
    /// The index never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
