//! The operator-facing facade over one migration session.
//!
//! A [`Session`] owns the corpus and the most recent preview. Apply only ever
//! resolves match ids against that preview, so ids from an older preview, or
//! from before a [`reset`](Session::reset), can never be applied by accident.

use crate::apply::{ApplyReport, apply};
use crate::corpus::{Corpus, Post, PostId};
use crate::error::{ErrorKind, Result};
use crate::scan::{ReferenceInventory, Scanner};
use crate::search::{MatchId, Preview, Scope, SearchSpec, preview};
use crate::summary::{self, LinkSummary};
use exn::OptionExt;
use rewire_extract::models::Article;

#[derive(Debug, Default)]
pub struct Session {
    corpus: Corpus,
    scanner: Scanner,
    preview: Option<Preview>,
}
impl Session {
    pub fn new(scanner: Scanner) -> Self {
        Self { corpus: Corpus::new(), scanner, preview: None }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn ingest(&mut self, article: Article) -> PostId {
        self.corpus.insert(article)
    }

    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        self.corpus.remove(id)
    }

    /// Drops every post and the stored preview.
    pub fn reset(&mut self) {
        self.corpus.clear();
        self.preview = None;
    }

    pub fn has_modifications(&self) -> bool {
        self.corpus.has_modifications()
    }

    pub fn scan_post(&self, id: PostId) -> Result<ReferenceInventory> {
        let post = self.corpus.get(id).ok_or_raise(|| ErrorKind::PostNotFound(id))?;
        Ok(self.scanner.scan(post))
    }

    pub fn scan_all(&self) -> Vec<ReferenceInventory> {
        self.scanner.scan_all(&self.corpus)
    }

    /// Previews a replacement and keeps the result for the next
    /// [`apply_replace`](Self::apply_replace). A failed preview clears the
    /// stored one.
    pub fn preview_replace(
        &mut self,
        pattern: impl Into<String>,
        is_regex: bool,
        replacement: impl Into<String>,
        scope: Scope,
    ) -> Result<&Preview> {
        self.preview = None;
        let spec = SearchSpec::new(pattern, is_regex, replacement);
        let preview = preview(&self.corpus, &self.scanner, &spec, scope)?;
        Ok(self.preview.insert(preview))
    }

    /// The preview the next apply resolves against, if any.
    pub fn last_preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Applies the selected matches of the last preview. Without a preview
    /// every id is reported stale.
    pub fn apply_replace(&mut self, ids: &[MatchId]) -> ApplyReport {
        match &self.preview {
            Some(preview) => apply(&mut self.corpus, preview, ids),
            None => {
                tracing::warn!(selected = ids.len(), "apply requested without a preview");
                apply(&mut self.corpus, &Preview::empty(), ids)
            },
        }
    }

    pub fn link_summary(&self) -> Vec<LinkSummary> {
        summary::link_summary(&self.corpus, &self.scan_all())
    }

    pub fn posts_with_url(&self, url: &str) -> Result<Vec<PostId>> {
        summary::posts_with_url(&self.corpus, url)
    }
}
