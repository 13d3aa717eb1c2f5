//! Main extraction logic for downloaded blog post pages.

mod clean;
mod dates;
mod taxonomy;

use std::convert::Infallible;
use std::str::FromStr;

pub use self::taxonomy::Taxonomy;
use crate::error::{ErrorKind, Result};
use crate::models::{Article, Details, ExtractOptions, TrackingFilter};
use crate::{consts, slug_from_url};
use exn::{OptionExt, ResultExt};
use regex::{Regex, escape as regex_escape};
use scraper::{ElementRef, Html, Selector};
use time::OffsetDateTime;
use tracing::instrument;
use url::Url;

#[derive(Debug)]
pub struct Extractor {
    document: Html,
    fallback_url: Option<String>,
}
impl Extractor {
    pub fn from_document(document: Html) -> Self {
        Self { document, fallback_url: None }
    }

    pub fn from_html(html: &str) -> Self {
        Self::from_document(Html::parse_document(html))
    }

    /// Where the page was fetched from, used when the page does not declare
    /// its own canonical URL.
    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }

    /// Extracts the post and its metadata from the page.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The page has no title and no fallback could be found
    /// - The page declares no URL and no fallback URL was given
    /// - A configured content selector or title suffix is invalid
    /// - The selected body could not be cleaned
    #[instrument(skip_all, fields(fallback_url = self.fallback_url.as_deref()))]
    pub fn article(&self, options: &ExtractOptions, tracking: &TrackingFilter) -> Result<Article> {
        let source_url = self.source_url().ok_or_raise(|| ErrorKind::MissingField("url"))?;
        let title = self.title(options)?;
        let parsed_url = Url::parse(&source_url).ok();
        let content = self.content(options)?;
        let body = clean::clean(&content, parsed_url.as_ref(), tracking)?;
        let taxonomy = self.taxonomy();
        let details = Details {
            slug: slug_from_url(&source_url),
            author: self.author(),
            published: self.published(&source_url),
            tags: taxonomy.tags(),
            categories: taxonomy.categories(&source_url),
        };
        tracing::debug!(url = %source_url, title = %title, body_size = body.len(), "extracted article");
        Ok(Article { source_url, title, body, details })
    }

    pub fn taxonomy(&self) -> Taxonomy<'_> {
        Taxonomy::new(&self.document)
    }

    fn first_attr(&self, selector: &Selector, attr: &str) -> Option<String> {
        self.document
            .select(selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.document.select(selector).map(Self::text_of).find(|text| !text.is_empty())
    }

    fn text_of(element: ElementRef<'_>) -> String {
        let text = element.text().collect::<String>();
        consts::WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
    }

    fn source_url(&self) -> Option<String> {
        self.first_attr(&consts::CANONICAL_SELECTOR, "href")
            .or_else(|| self.first_attr(&consts::OG_URL_SELECTOR, "content"))
            .or_else(|| self.fallback_url.clone())
    }

    fn title(&self, options: &ExtractOptions) -> Result<String> {
        let title = self
            .first_attr(&consts::OG_TITLE_SELECTOR, "content")
            .or_else(|| self.first_text(&consts::H1_SELECTOR))
            .or_else(|| self.first_text(&consts::TITLE_SELECTOR))
            .ok_or_raise(|| ErrorKind::MissingField("title"))?;
        let Some(suffix) = title_suffix_regex(&options.title_suffixes)? else {
            return Ok(title);
        };
        let stripped = suffix.replace(&title, "").trim().to_string();
        // A title that is nothing but the brand name is still better than no title.
        Ok(if stripped.is_empty() { title } else { stripped })
    }

    fn author(&self) -> Option<String> {
        self.first_attr(&consts::AUTHOR_META_SELECTOR, "content")
            .or_else(|| self.first_text(&consts::AUTHOR_REL_SELECTOR))
    }

    fn published(&self, source_url: &str) -> Option<OffsetDateTime> {
        self.first_attr(&consts::PUBLISHED_META_SELECTOR, "content")
            .and_then(|value| dates::parse_timestamp(&value))
            .or_else(|| {
                self.document
                    .select(&consts::TIME_SELECTOR)
                    .filter_map(|el| el.value().attr("datetime"))
                    .find_map(dates::parse_timestamp)
            })
            .or_else(|| {
                self.document
                    .select(&consts::META_CONTAINER_SELECTOR)
                    .map(Self::text_of)
                    .find_map(|text| dates::parse_prose(&text))
            })
            .or_else(|| dates::from_url(source_url))
    }

    /// Inner HTML of the first configured content element with enough text,
    /// falling back to the whole `<body>`.
    fn content(&self, options: &ExtractOptions) -> Result<String> {
        for css in &options.content_selectors {
            let selector = Selector::parse(css).ok().ok_or_raise(|| ErrorKind::InvalidOption(css.clone()))?;
            if let Some(element) = self
                .document
                .select(&selector)
                .find(|el| el.text().collect::<String>().trim().chars().count() > options.min_content_chars)
            {
                tracing::trace!(selector = %css, "selected content element");
                return Ok(element.inner_html());
            }
        }
        tracing::debug!("no content selector matched, falling back to <body>");
        Ok(self
            .document
            .select(&consts::BODY_SELECTOR)
            .next()
            .unwrap_or_else(|| self.document.root_element())
            .inner_html())
    }
}
impl FromStr for Extractor {
    type Err = Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_html(s))
    }
}
impl From<String> for Extractor {
    fn from(html: String) -> Self {
        Self::from_html(&html)
    }
}
impl From<Html> for Extractor {
    fn from(document: Html) -> Self {
        Self::from_document(document)
    }
}

/// Compiles configured brand names into a `" - Brand..."` / `" | Brand..."`
/// suffix pattern.
fn title_suffix_regex(suffixes: &[String]) -> Result<Option<Regex>> {
    let names: Vec<String> =
        suffixes.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(regex_escape).collect();
    if names.is_empty() {
        return Ok(None);
    }
    let pattern = format!(r"(?i)\s*[-|\u{{2013}}\u{{2014}}]\s*(?:{}).*$", names.join("|"));
    Regex::new(&pattern).map(Some).or_raise(|| ErrorKind::InvalidOption(pattern.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    const DIVI_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>New Arrivals - Fitzgerald Auto Mall</title>
    <link rel="canonical" href="https://www.dealer.com/2024/march/3/new-arrivals/">
    <meta name="author" content="Sales Team">
</head>
<body>
    <header><nav><a href="https://www.dealer.com/">Home</a></nav></header>
    <div class="et_pb_title_meta_container">by Admin | March 3, 2024 | <a href="/category/news">News</a></div>
    <div class="et_pb_post_content">
        <p>Spring brings a fresh lineup to the showroom floor, with trims and packages for every budget.
        <a href="https://www.dealer.com/inventory/">Browse inventory</a> or
        <a href="https://www.manufacturer.com/models">see the full range</a>.</p>
        <script>window.track()</script>
    </div>
    <div class="post-tags"><a href="/tag/spring">Spring</a><a href="/tag/suv">SUV</a></div>
</body>
</html>"#;

    fn options() -> ExtractOptions {
        ExtractOptions { title_suffixes: vec!["Fitzgerald".into()], ..ExtractOptions::default() }
    }

    #[test]
    fn test_extracts_full_article() {
        let article = Extractor::from_html(DIVI_PAGE).article(&options(), &TrackingFilter::default()).unwrap();
        assert_eq!(article.source_url, "https://www.dealer.com/2024/march/3/new-arrivals/");
        assert_eq!(article.title, "New Arrivals");
        assert_eq!(article.details.slug, "new-arrivals");
        assert_eq!(article.details.author.as_deref(), Some("Sales Team"));
        assert_eq!(article.details.published, Some(datetime!(2024-03-03 00:00:00 UTC)));
        assert_eq!(article.details.tags, vec!["Spring", "SUV"]);
        assert_eq!(article.details.categories, vec!["News"]);
        assert!(article.body.starts_with("<div class=\"post-content\">"));
        assert!(article.body.contains("<a href=\"/inventory/\">Browse inventory</a>"));
        assert!(article.body.contains("<a href=\"https://www.manufacturer.com/models\">"));
        assert!(!article.body.contains("window.track"));
        assert!(!article.body.contains("Home"));
    }

    #[test]
    fn test_falls_back_to_body_and_fallback_url() {
        let html = "<html><head><title>Short</title></head><body><p>Tiny page</p></body></html>";
        let article = Extractor::from_html(html)
            .with_fallback_url("https://example.com/posts/short.html")
            .article(&ExtractOptions::default(), &TrackingFilter::default())
            .unwrap();
        assert_eq!(article.source_url, "https://example.com/posts/short.html");
        assert_eq!(article.details.slug, "short");
        assert!(article.body.contains("<p>Tiny page</p>"));
        assert_eq!(article.details.categories, vec!["Posts"]);
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let html = "<html><head><title>Orphan</title></head><body></body></html>";
        let err = Extractor::from_html(html).article(&ExtractOptions::default(), &TrackingFilter::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField("url"));
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let html = "<html><body><p>untitled</p></body></html>";
        let err = Extractor::from_html(html)
            .with_fallback_url("https://example.com/x")
            .article(&ExtractOptions::default(), &TrackingFilter::default())
            .unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField("title"));
    }

    #[test]
    fn test_invalid_content_selector_is_reported() {
        let options = ExtractOptions { content_selectors: vec!["div[".into()], ..ExtractOptions::default() };
        let err = Extractor::from_html(DIVI_PAGE).article(&options, &TrackingFilter::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidOption("div[".into()));
    }

    #[rstest]
    #[case("New Arrivals - Fitzgerald Auto Mall", "New Arrivals")]
    #[case("New Arrivals | fitzgerald", "New Arrivals")]
    #[case("Fitzgerald", "Fitzgerald")]
    #[case("Service Specials", "Service Specials")]
    fn test_title_suffix(#[case] title: &str, #[case] expected: &str) {
        let html = format!("<html><head><title>{title}</title></head><body></body></html>");
        let extractor = Extractor::from_html(&html);
        assert_eq!(extractor.title(&options()).unwrap(), expected);
    }
}
