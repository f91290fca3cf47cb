//! Config Error Types
//!
//! Structured errors using `exn` for automatic location tracking, in line with
//! the other crates of the workspace.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The merged configuration sources do not describe a valid config. The
    /// underlying figment error (with the offending key and source) is kept in
    /// the error tree.
    #[display("invalid configuration")]
    Invalid,
}
