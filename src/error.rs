//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("could not extract a post from {}", _0.display())]
    Extract(#[error(not(source))] PathBuf),
    #[display("none of the given pages could be extracted")]
    NoPages,
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("operation failed")]
    Library,
    #[display("could not export posts")]
    Export,
    #[display("could not write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    #[display("could not write output")]
    Output,
}
