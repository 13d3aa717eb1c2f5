//! The in-memory set of posts being migrated.
//!
//! Posts keep both the body as extracted and the body as rewritten, so either
//! can be exported at any time. Insertion order is the corpus order used by
//! previews and exports.

use indexmap::IndexMap;
use rewire_extract::models::{Article, Details};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::num::ParseIntError;
use std::str::FromStr;

/// Opaque post identifier, unique for the lifetime of a [`Corpus`].
///
/// Identifiers are handed out from a counter that never goes backwards, so an
/// id of a removed post is never given to a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);
impl PostId {
    pub fn get(self) -> u64 {
        self.0
    }
}
impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
impl FromStr for PostId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: PostId,
    source_url: String,
    title: String,
    details: Details,
    original_body: String,
    current_body: String,
    revision: u64,
    modified: bool,
}
impl Post {
    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    /// The body exactly as extracted; never changes.
    pub fn original_body(&self) -> &str {
        &self.original_body
    }

    /// The body with every committed replacement applied.
    pub fn current_body(&self) -> &str {
        &self.current_body
    }

    /// Bumped on every committed change to [`current_body`](Self::current_body).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn commit(&mut self, body: String) {
        self.current_body = body;
        self.revision += 1;
        self.modified = true;
    }
}

#[derive(Debug, Default)]
pub struct Corpus {
    posts: IndexMap<PostId, Post>,
    next_id: u64,
}
impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extracted article as a new, unmodified post.
    pub fn insert(&mut self, article: Article) -> PostId {
        self.next_id += 1;
        let id = PostId(self.next_id);
        let Article { source_url, title, body, details } = article;
        tracing::debug!(post_id = %id, url = %source_url, "post added to corpus");
        self.posts.insert(
            id,
            Post {
                id,
                source_url,
                title,
                details,
                current_body: body.clone(),
                original_body: body,
                revision: 0,
                modified: false,
            },
        );
        id
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.get_mut(&id)
    }

    /// Removes a post, keeping the order of the others.
    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        self.posts.shift_remove(&id)
    }

    /// Drops every post. Identifiers keep counting from where they were.
    pub fn clear(&mut self) {
        self.posts.clear();
    }

    /// Posts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = PostId> + '_ {
        self.posts.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Whether any post carries a committed replacement.
    pub fn has_modifications(&self) -> bool {
        self.posts.values().any(Post::is_modified)
    }
}
impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Post;
    type IntoIter = indexmap::map::Values<'a, PostId, Post>;
    fn into_iter(self) -> Self::IntoIter {
        self.posts.values()
    }
}
impl FromIterator<Article> for Corpus {
    fn from_iter<I: IntoIterator<Item = Article>>(iter: I) -> Self {
        let mut corpus = Self::new();
        for article in iter {
            corpus.insert(article);
        }
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(n: u32) -> Article {
        Article::new(format!("https://example.com/post-{n}/"), format!("Post {n}"), format!("<p>{n}</p>"))
    }

    #[test]
    fn test_insert_preserves_order_and_bodies() {
        let corpus: Corpus = (1..=3).map(article).collect();
        let titles: Vec<_> = corpus.iter().map(Post::title).collect();
        assert_eq!(titles, vec!["Post 1", "Post 2", "Post 3"]);
        let post = corpus.iter().next().unwrap();
        assert_eq!(post.original_body(), post.current_body());
        assert_eq!(post.revision(), 0);
        assert!(!post.is_modified());
        assert_eq!(post.details().slug, "post-1");
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut corpus = Corpus::new();
        let first = corpus.insert(article(1));
        corpus.remove(first);
        corpus.clear();
        let second = corpus.insert(article(2));
        assert_ne!(first, second);
        assert!(corpus.get(first).is_none());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut corpus = Corpus::new();
        let ids: Vec<_> = (1..=3).map(|n| corpus.insert(article(n))).collect();
        corpus.remove(ids[1]);
        assert_eq!(corpus.ids().collect::<Vec<_>>(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_commit_tracks_modification() {
        let mut corpus = Corpus::new();
        let id = corpus.insert(article(1));
        assert!(!corpus.has_modifications());
        corpus.get_mut(id).unwrap().commit("<p>changed</p>".into());
        let post = corpus.get(id).unwrap();
        assert_eq!(post.current_body(), "<p>changed</p>");
        assert_eq!(post.original_body(), "<p>1</p>");
        assert_eq!(post.revision(), 1);
        assert!(corpus.has_modifications());
    }

    #[test]
    fn test_post_id_parses_and_displays() {
        let id: PostId = " 42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert!("x".parse::<PostId>().is_err());
    }
}
