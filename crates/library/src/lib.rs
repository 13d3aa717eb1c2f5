//! Hyperlink inventory and selective rewriting over a corpus of migrated posts.
//!
//! The flow is scan, preview, apply:
//!
//! - [`Scanner`] lists what a post links to, keeping hyperlinks and images apart.
//! - [`preview()`] finds every hyperlink a search would change and issues a
//!   [`MatchId`] for each proposed change.
//! - [`apply()`] takes any subset of those ids and rewrites exactly those
//!   hyperlinks, refusing ids that no longer describe the content.
//!
//! [`Session`] bundles the three around a [`Corpus`] for interactive use.
//!
//! # Example
//!
//! ```
//! use rewire_extract::models::Article;
//! use rewire_library::{Scope, Session};
//!
//! let mut session = Session::default();
//! let id = session.ingest(Article::new(
//!     "https://blog.example.com/spring/",
//!     "Spring",
//!     r#"<p><a href="http://old.com/a">A</a> <a href="http://old.com/b">B</a></p>"#,
//! ));
//! let preview = session.preview_replace("old.com", false, "new.com", Scope::All).unwrap();
//! let second = preview.groups()[0].matches[1].match_id;
//!
//! let report = session.apply_replace(&[second]);
//! assert_eq!(report.changes_made, 1);
//! assert_eq!(
//!     session.corpus().get(id).unwrap().current_body(),
//!     r#"<p><a href="http://old.com/a">A</a> <a href="http://new.com/b">B</a></p>"#,
//! );
//! ```

mod apply;
pub mod corpus;
pub mod error;
mod markup;
pub mod scan;
pub mod search;
mod session;
mod summary;

pub use crate::apply::{ApplyReport, PostOutcome, apply};
pub use crate::corpus::{Corpus, Post, PostId};
pub use crate::scan::{LinkScope, Reference, ReferenceInventory, ReferenceKind, ScanOptions, Scanner};
pub use crate::search::{MatchCandidate, MatchId, PostFailure, PostMatches, Preview, Scope, SearchSpec, preview};
pub use crate::session::Session;
pub use crate::summary::{LinkSighting, LinkSummary, link_summary, posts_with_url};
