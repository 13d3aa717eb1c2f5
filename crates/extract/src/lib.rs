mod consts;
pub mod error;
mod extract;
pub mod models;

use tracing::instrument;
use url::Url;

use crate::error::Result;
pub use crate::extract::{Extractor, Taxonomy};
use crate::models::{Article, ExtractOptions, TrackingFilter};

/// Easy, top-level entrypoint for the extraction of an [`Article`] from a
/// downloaded page.
///
/// `fallback_url` is where the page came from; it is only used when the page
/// does not declare a canonical URL of its own. See [`Extractor`] for more
/// details.
#[instrument(skip(html, options, tracking), fields(html_size = html.len()))]
pub fn extract(
    html: &str,
    fallback_url: Option<&str>,
    options: &ExtractOptions,
    tracking: &TrackingFilter,
) -> Result<Article> {
    let mut extractor = Extractor::from_html(html);
    if let Some(url) = fallback_url {
        extractor = extractor.with_fallback_url(url);
    }
    extractor.article(options, tracking)
}

/// Derives a post name from the last path segment of a URL.
///
/// `.htm`/`.html` extensions are dropped, anything outside `[A-Za-z0-9-]`
/// becomes a dash, and runs of dashes collapse. Falls back to `"post"`.
pub fn slug_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".html").or_else(|| path.strip_suffix(".htm")).unwrap_or(path);
    let segment = path.rsplit('/').next().unwrap_or_default();
    let slug = consts::SLUG_INVALID_REGEX.replace_all(segment, "-");
    let slug = consts::SLUG_DASHES_REGEX.replace_all(&slug, "-");
    match slug.trim_matches('-') {
        "" => "post".to_string(),
        slug => slug.to_string(),
    }
}
