//! Corpus-wide views over hyperlinks.

use crate::corpus::{Corpus, PostId};
use crate::error::{ErrorKind, Result};
use crate::scan::{LinkScope, ReferenceInventory};
use indexmap::IndexMap;
use memchr::memmem;
use serde::Serialize;

/// Where a link was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSighting {
    pub post_id: PostId,
    pub post_title: String,
    pub source_url: String,
    pub anchor_text: String,
    pub context: String,
}

/// One distinct hyperlink target across the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub target: String,
    pub count: usize,
    pub scope: LinkScope,
    pub first_seen: LinkSighting,
}

/// Groups the hyperlinks of `inventories` by target, most frequent first.
/// Ties keep the order in which targets first appear.
pub fn link_summary(corpus: &Corpus, inventories: &[ReferenceInventory]) -> Vec<LinkSummary> {
    let mut grouped: IndexMap<&str, LinkSummary> = IndexMap::new();
    for inventory in inventories {
        let Some(post) = corpus.get(inventory.post_id) else {
            continue;
        };
        for link in &inventory.hyperlinks {
            grouped
                .entry(link.target.as_str())
                .and_modify(|summary| summary.count += 1)
                .or_insert_with(|| LinkSummary {
                    target: link.target.clone(),
                    count: 1,
                    scope: link.scope.unwrap_or(LinkScope::Other),
                    first_seen: LinkSighting {
                        post_id: post.id(),
                        post_title: post.title().to_string(),
                        source_url: post.source_url().to_string(),
                        anchor_text: link.anchor_text.clone().unwrap_or_default(),
                        context: link.context.clone(),
                    },
                });
        }
    }
    let mut summaries: Vec<LinkSummary> = grouped.into_values().collect();
    // Stable, so equal counts stay in first-seen order.
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

/// Posts whose current body contains `needle` verbatim, in corpus order.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidSearchSpec`] for an empty `needle`.
pub fn posts_with_url(corpus: &Corpus, needle: &str) -> Result<Vec<PostId>> {
    if needle.is_empty() {
        exn::bail!(ErrorKind::InvalidSearchSpec);
    }
    let finder = memmem::Finder::new(needle.as_bytes());
    Ok(corpus
        .iter()
        .filter(|post| finder.find(post.current_body().as_bytes()).is_some())
        .map(|post| post.id())
        .collect())
}
