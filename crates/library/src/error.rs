//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Errors about the caller's input (a bad pattern, an unknown post) abort the
//! operation. Errors about a single post's content are carried as data in
//! previews and apply reports so the rest of the corpus is still processed.

use crate::corpus::PostId;
use crate::search::MatchId;
use derive_more::{Display, Error};
use serde::{Serialize, Serializer};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The search pattern was empty.
    #[display("search pattern must not be empty")]
    InvalidSearchSpec,
    /// The regular expression did not compile; carries the syntax complaint.
    #[display("invalid pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// A match id could not be parsed from its `post:occurrence` form.
    #[display("invalid match id: {_0}")]
    InvalidMatchId(#[error(not(source))] String),
    /// The match id no longer describes the post's content.
    #[display("stale match: {_0}")]
    StaleMatch(#[error(not(source))] MatchId),
    /// The post's markup could not be tokenized or rewritten.
    #[display("unparsable content in post {_0}")]
    UnparsableContent(#[error(not(source))] PostId),
    #[display("post not found: {_0}")]
    PostNotFound(#[error(not(source))] PostId),
    /// A configured CSS selector did not parse.
    #[display("invalid selector: {_0}")]
    InvalidSelector(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A fresh preview makes stale matches actionable again.
        matches!(self, Self::StaleMatch(_))
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
