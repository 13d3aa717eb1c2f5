//! Applies a chosen subset of previewed replacements to the corpus.
//!
//! The applier never takes search strings, only [`MatchId`]s issued by a
//! [`Preview`]. Each id is checked against the post as it is now: if the
//! hyperlink it points at no longer carries the previewed target, the id is
//! stale and skipped. All selected rewrites of a post happen in one token pass,
//! and the result is re-tokenized before it replaces the post body, so a post
//! is either fully updated or left untouched.

use crate::corpus::{Corpus, PostId};
use crate::error::ErrorKind;
use crate::markup::{Rewrite, Tokenizer};
use crate::search::{MatchCandidate, MatchId, PostMatches, Preview};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;

/// What happened to the selected matches of one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostOutcome {
    pub post_id: PostId,
    pub applied: Vec<MatchId>,
    /// Ids skipped as [`ErrorKind::StaleMatch`].
    pub stale: Vec<MatchId>,
    /// Set when the post could not be rewritten; nothing was applied to it.
    pub error: Option<ErrorKind>,
}
impl PostOutcome {
    fn new(post_id: PostId) -> Self {
        Self { post_id, applied: Vec::new(), stale: Vec::new(), error: None }
    }

    /// Per-match errors, for callers that want them as [`ErrorKind`]s.
    pub fn stale_errors(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.stale.iter().copied().map(ErrorKind::StaleMatch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Number of hyperlinks rewritten across the corpus.
    pub changes_made: usize,
    /// One entry per post that had a selected id, in preview order.
    pub posts: Vec<PostOutcome>,
}
impl ApplyReport {
    pub fn stale(&self) -> impl Iterator<Item = MatchId> + '_ {
        self.posts.iter().flat_map(|post| post.stale.iter().copied())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PostOutcome> {
        self.posts.iter().filter(|post| post.error.is_some())
    }

    pub fn modified_posts(&self) -> impl Iterator<Item = PostId> + '_ {
        self.posts.iter().filter(|post| !post.applied.is_empty()).map(|post| post.post_id)
    }
}

/// Applies the `selected` matches of `preview` to `corpus`.
///
/// Duplicate ids are applied once. Ids the preview never issued, ids whose
/// post has left the corpus, and ids whose hyperlink changed since the preview
/// are reported as stale. A post that cannot be rewritten is reported with
/// [`ErrorKind::UnparsableContent`] and the remaining posts are still applied.
#[instrument(skip_all, fields(selected = selected.len(), previewed = preview.total_matches()))]
pub fn apply(corpus: &mut Corpus, preview: &Preview, selected: &[MatchId]) -> ApplyReport {
    let selected: BTreeSet<MatchId> = selected.iter().copied().collect();
    let mut outcomes: IndexMap<PostId, PostOutcome> = IndexMap::new();

    for group in preview.groups() {
        let chosen: Vec<&MatchCandidate> =
            group.matches.iter().filter(|candidate| selected.contains(&candidate.match_id)).collect();
        if !chosen.is_empty() {
            outcomes.insert(group.post_id, apply_post(corpus, preview, group, &chosen));
        }
    }
    // Ids this preview never issued cannot be trusted to mean anything.
    for id in selected.iter().filter(|id| preview.find(**id).is_none()) {
        tracing::debug!(match_id = %id, "match id not issued by this preview");
        outcomes.entry(id.post).or_insert_with(|| PostOutcome::new(id.post)).stale.push(*id);
    }

    let posts: Vec<PostOutcome> = outcomes.into_values().collect();
    let report = ApplyReport { changes_made: posts.iter().map(|post| post.applied.len()).sum(), posts };
    tracing::info!(
        changes_made = report.changes_made,
        stale = report.stale().count(),
        failed = report.failed().count(),
        "replacements applied"
    );
    report
}

fn apply_post(corpus: &mut Corpus, preview: &Preview, group: &PostMatches, chosen: &[&MatchCandidate]) -> PostOutcome {
    let mut outcome = PostOutcome::new(group.post_id);
    let Some(post) = corpus.get(group.post_id) else {
        tracing::debug!(post_id = %group.post_id, "post left the corpus since the preview");
        outcome.stale = chosen.iter().map(|candidate| candidate.match_id).collect();
        return outcome;
    };

    let by_anchor: HashMap<usize, &MatchCandidate> =
        chosen.iter().map(|candidate| (candidate.anchor, *candidate)).collect();
    let tokenizer = preview.tokenizer();
    let mut applied = Vec::new();
    let rewrite = tokenizer.rewrite_hrefs(post.current_body(), |ordinal, href| {
        let candidate = by_anchor.get(&ordinal)?;
        if href.trim() != candidate.before {
            return None;
        }
        applied.push(candidate.match_id);
        Some(candidate.after.clone())
    });

    let rewrite = match rewrite {
        Ok(rewrite) => rewrite,
        Err(err) => {
            tracing::warn!(post_id = %group.post_id, error = %err, "could not rewrite post");
            outcome.error = Some(ErrorKind::UnparsableContent(group.post_id));
            return outcome;
        },
    };
    outcome.stale = chosen.iter().map(|candidate| candidate.match_id).filter(|id| !applied.contains(id)).collect();
    if applied.is_empty() {
        return outcome;
    }

    if !holds_together(tokenizer, &rewrite) {
        tracing::warn!(post_id = %group.post_id, "rewritten post failed verification, leaving it untouched");
        outcome.error = Some(ErrorKind::UnparsableContent(group.post_id));
        return outcome;
    }

    if let Some(post) = corpus.get_mut(group.post_id) {
        post.commit(rewrite.html);
        tracing::debug!(post_id = %group.post_id, revision = post.revision(), applied = applied.len(), "post updated");
        outcome.applied = applied;
    }
    outcome
}

/// Whether the rewritten body still tokenizes to the same number of hyperlinks.
fn holds_together(tokenizer: &Tokenizer, rewrite: &Rewrite) -> bool {
    match tokenizer.anchors(&rewrite.html) {
        Ok(anchors) if anchors.len() == rewrite.anchors => true,
        Ok(anchors) => {
            tracing::debug!(before = rewrite.anchors, after = anchors.len(), "rewritten post lost hyperlinks");
            false
        },
        Err(err) => {
            tracing::debug!(error = %err, "rewritten post does not tokenize");
            false
        },
    }
}
