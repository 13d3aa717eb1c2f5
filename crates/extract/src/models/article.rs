use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single blog post pulled out of a downloaded page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Where the page says it lives (canonical URL, or where it was fetched from)
    pub source_url: String,
    /// Post title with any configured site suffix removed
    pub title: String,
    /// Cleaned body HTML wrapped in a `post-content` container
    pub body: String,
    pub details: Details,
}
impl Article {
    /// Builds an article with empty [`Details`]; the slug is derived from the URL.
    pub fn new(source_url: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let source_url = source_url.into();
        let details = Details { slug: crate::slug_from_url(&source_url), ..Details::default() };
        Self { source_url, title: title.into(), body: body.into(), details }
    }
}

/// Metadata that travels with a post into the export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    /// URL-safe post name
    pub slug: String,
    pub author: Option<String>,
    /// Original publication date, if the page or its URL gives one away
    #[serde(with = "time::serde::rfc3339::option")]
    pub published: Option<OffsetDateTime>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
}
