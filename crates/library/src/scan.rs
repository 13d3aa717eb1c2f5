//! Inventory of the outbound references in a post body.
//!
//! Scanning parses the body into a tree, skips site chrome (navigation,
//! headers, footers) and lists hyperlinks and images separately, each with a
//! bit of surrounding text for review. Tracking images are dropped from the
//! inventory. Broken markup never aborts a scan: the parser recovers and the
//! number of recoveries is reported alongside the references.

use crate::corpus::{Corpus, Post, PostId};
use crate::error::{ErrorKind, Result};
use crate::markup::Tokenizer;
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use rewire_extract::models::TrackingFilter;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::instrument;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Parent text up to this many characters is used as context verbatim.
    pub context_chars: usize,
    /// Characters kept either side of the anchor text in longer contexts.
    pub context_padding: usize,
    /// Regions whose references are not part of the post itself.
    pub chrome_selectors: Vec<String>,
    /// Bytes the tokenizer may hold for one post while previewing or
    /// applying. Posts that need more are reported as unparsable.
    pub max_markup_bytes: usize,
}
impl Default for ScanOptions {
    fn default() -> Self {
        let chrome = ["nav", "header", "footer", "aside", "[role='navigation']", ".menu", ".sidebar", ".breadcrumbs"];
        Self {
            context_chars: 150,
            context_padding: 50,
            chrome_selectors: chrome.into_iter().map(String::from).collect(),
            max_markup_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    #[display("hyperlink")]
    Hyperlink,
    #[display("image")]
    Image,
}

/// Where a hyperlink points, relative to the post it sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkScope {
    /// Absolute URL on the post's own host.
    #[display("internal")]
    Internal,
    /// Absolute URL on another host.
    #[display("external")]
    External,
    /// Path without scheme or host.
    #[display("relative")]
    Relative,
    /// Host-less schemes such as `mailto:` or `tel:`.
    #[display("other")]
    Other,
}
impl LinkScope {
    pub fn classify(target: &str, source: Option<&Url>) -> Self {
        match Url::parse(target) {
            Ok(url) => match (url.host_str(), source.and_then(Url::host_str)) {
                (Some(host), Some(own)) if host.eq_ignore_ascii_case(own) => Self::Internal,
                (Some(_), _) => Self::External,
                (None, _) => Self::Other,
            },
            Err(_) => Self::Relative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Decoded `href` or `src`.
    pub target: String,
    /// Visible link text; hyperlinks only.
    pub anchor_text: Option<String>,
    pub context: String,
    pub owning_post_id: PostId,
    /// Hyperlinks only.
    pub scope: Option<LinkScope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceInventory {
    pub post_id: PostId,
    pub hyperlinks: Vec<Reference>,
    pub images: Vec<Reference>,
    /// References skipped because they sit in site chrome.
    pub dropped_chrome: usize,
    /// Images skipped as tracking beacons.
    pub dropped_tracking: usize,
    /// Markup errors the parser recovered from.
    pub parse_errors: usize,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    chrome: Option<Selector>,
    tokenizer: Tokenizer,
    tracking: TrackingFilter,
    context_chars: usize,
    context_padding: usize,
}
impl Default for Scanner {
    fn default() -> Self {
        let options = ScanOptions::default();
        Self {
            chrome: Selector::parse(&options.chrome_selectors.join(", ")).ok(),
            tokenizer: Tokenizer::new(options.chrome_selectors, options.max_markup_bytes),
            tracking: TrackingFilter::default(),
            context_chars: options.context_chars,
            context_padding: options.context_padding,
        }
    }
}
impl Scanner {
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidSelector`] naming the first chrome selector
    /// that does not parse.
    pub fn new(options: &ScanOptions, tracking: TrackingFilter) -> Result<Self> {
        let selectors: Vec<&str> =
            options.chrome_selectors.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
        // Both parsers see the same selectors: the tree for scanning and the
        // tokenizer for previewing and applying.
        for css in &selectors {
            Selector::parse(css).ok().ok_or_raise(|| ErrorKind::InvalidSelector(css.to_string()))?;
            css.parse::<lol_html::Selector>().or_raise(|| ErrorKind::InvalidSelector(css.to_string()))?;
        }
        let chrome = if selectors.is_empty() {
            None
        } else {
            let joined = selectors.join(", ");
            Some(Selector::parse(&joined).ok().ok_or_raise(|| ErrorKind::InvalidSelector(joined.clone()))?)
        };
        let tokenizer = Tokenizer::new(selectors.iter().map(|s| s.to_string()).collect(), options.max_markup_bytes);
        Ok(Self {
            chrome,
            tokenizer,
            tracking,
            context_chars: options.context_chars,
            context_padding: options.context_padding,
        })
    }

    /// The tokenizer preview and apply use, excluding the same chrome.
    pub(crate) fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Lists the hyperlinks and images of the post's current body.
    #[instrument(skip_all, fields(post_id = %post.id()))]
    pub fn scan(&self, post: &Post) -> ReferenceInventory {
        let document = Html::parse_fragment(post.current_body());
        let source = Url::parse(post.source_url()).ok();
        let chrome: HashSet<_> = match &self.chrome {
            Some(selector) => document.select(selector).map(|el| el.id()).collect(),
            None => HashSet::new(),
        };
        let in_chrome = |el: &ElementRef<'_>| {
            chrome.contains(&el.id()) || el.ancestors().any(|node| chrome.contains(&node.id()))
        };

        let mut inventory = ReferenceInventory {
            post_id: post.id(),
            hyperlinks: Vec::new(),
            images: Vec::new(),
            dropped_chrome: 0,
            dropped_tracking: 0,
            parse_errors: document.errors.len(),
        };

        for anchor in document.select(&LINK_SELECTOR) {
            let target = anchor.value().attr("href").unwrap_or_default().trim().to_string();
            if target.is_empty() || target.starts_with('#') {
                continue;
            }
            if in_chrome(&anchor) {
                inventory.dropped_chrome += 1;
                continue;
            }
            let anchor_text = collapse(anchor.text());
            inventory.hyperlinks.push(Reference {
                kind: ReferenceKind::Hyperlink,
                scope: Some(LinkScope::classify(&target, source.as_ref())),
                context: self.context(&anchor, &anchor_text),
                anchor_text: Some(anchor_text),
                target,
                owning_post_id: post.id(),
            });
        }

        for image in document.select(&IMAGE_SELECTOR) {
            let element = image.value();
            let target = element.attr("src").unwrap_or_default().trim().to_string();
            if target.is_empty() {
                continue;
            }
            if in_chrome(&image) {
                inventory.dropped_chrome += 1;
                continue;
            }
            if self.tracking.is_tracking_image(&target, element.attr("width"), element.attr("height")) {
                inventory.dropped_tracking += 1;
                continue;
            }
            let alt = element.attr("alt").map(str::trim).unwrap_or_default();
            let context = if alt.is_empty() { self.context(&image, "") } else { truncate(alt, self.context_chars) };
            inventory.images.push(Reference {
                kind: ReferenceKind::Image,
                target,
                anchor_text: None,
                context,
                owning_post_id: post.id(),
                scope: None,
            });
        }

        tracing::debug!(
            hyperlinks = inventory.hyperlinks.len(),
            images = inventory.images.len(),
            dropped_chrome = inventory.dropped_chrome,
            dropped_tracking = inventory.dropped_tracking,
            parse_errors = inventory.parse_errors,
            "post scanned"
        );
        inventory
    }

    /// Scans every post, in corpus order. One post's markup never affects another's scan.
    pub fn scan_all(&self, corpus: &Corpus) -> Vec<ReferenceInventory> {
        corpus.iter().map(|post| self.scan(post)).collect()
    }

    /// Text of the parent element, windowed around `needle` when it is too long.
    fn context(&self, element: &ElementRef<'_>, needle: &str) -> String {
        let parent = element.parent().and_then(ElementRef::wrap).map(|parent| collapse(parent.text())).unwrap_or_default();
        window(&parent, needle, self.context_chars, self.context_padding)
    }
}

fn collapse<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn window(text: &str, needle: &str, budget: usize, padding: usize) -> String {
    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }
    let Some(byte_start) = Some(needle).filter(|n| !n.is_empty()).and_then(|n| text.find(n)) else {
        return truncate(text, budget);
    };
    let start = text[..byte_start].chars().count();
    let from = start.saturating_sub(padding);
    let to = (start + needle.chars().count() + padding).min(total);
    let mut snippet: String = text.chars().skip(from).take(to - from).collect();
    if from > 0 {
        snippet.insert_str(0, "...");
    }
    if to < total {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_extract::models::Article;
    use rstest::rstest;

    fn post(body: &str) -> (Corpus, PostId) {
        let mut corpus = Corpus::new();
        let id = corpus.insert(Article::new("https://www.dealer.com/2024/march/3/post/", "Post", body));
        (corpus, id)
    }

    fn scan(body: &str) -> ReferenceInventory {
        let (corpus, id) = post(body);
        Scanner::default().scan(corpus.get(id).unwrap())
    }

    #[rstest]
    #[case("https://www.dealer.com/service", LinkScope::Internal)]
    #[case("https://WWW.Dealer.com/service", LinkScope::Internal)]
    #[case("https://other.com/", LinkScope::External)]
    #[case("/inventory/", LinkScope::Relative)]
    #[case("page.html", LinkScope::Relative)]
    #[case("mailto:sales@dealer.com", LinkScope::Other)]
    fn test_link_scope(#[case] target: &str, #[case] expected: LinkScope) {
        let source = Url::parse("https://www.dealer.com/post/").unwrap();
        assert_eq!(LinkScope::classify(target, Some(&source)), expected);
    }

    #[test]
    fn test_separates_links_and_images() {
        let inventory = scan(
            r#"<p>Read <a href="https://other.com/a">the review</a> today.</p>
            <p><img src="https://other.com/a" alt="Review screenshot"></p>"#,
        );
        assert_eq!(inventory.hyperlinks.len(), 1);
        assert_eq!(inventory.images.len(), 1);
        let link = &inventory.hyperlinks[0];
        assert_eq!(link.kind, ReferenceKind::Hyperlink);
        assert_eq!(link.anchor_text.as_deref(), Some("the review"));
        assert_eq!(link.context, "Read the review today.");
        assert_eq!(link.scope, Some(LinkScope::External));
        let image = &inventory.images[0];
        assert_eq!(image.kind, ReferenceKind::Image);
        assert_eq!(image.anchor_text, None);
        assert_eq!(image.context, "Review screenshot");
        assert_eq!(image.scope, None);
    }

    #[test]
    fn test_drops_tracking_images() {
        let inventory = scan(
            r#"<p><img src="http://old.com/a" width="1" height="1"><img src="https://www.google-analytics.com/collect">
            <img src="/real.jpg" width="640"></p>"#,
        );
        assert_eq!(inventory.images.len(), 1);
        assert_eq!(inventory.images[0].target, "/real.jpg");
        assert_eq!(inventory.dropped_tracking, 2);
    }

    #[test]
    fn test_skips_chrome_regions() {
        let inventory = scan(
            r#"<nav><a href="/home">Home</a></nav><p><a href="/post">Post</a></p>
            <footer><div><a href="/privacy">Privacy</a></div></footer>"#,
        );
        assert_eq!(inventory.hyperlinks.len(), 1);
        assert_eq!(inventory.hyperlinks[0].target, "/post");
        assert_eq!(inventory.dropped_chrome, 2);
    }

    #[test]
    fn test_skips_empty_and_fragment_links() {
        let inventory = scan(r##"<a href="">x</a><a href="#top">top</a><a href=" /ok ">ok</a>"##);
        assert_eq!(inventory.hyperlinks.len(), 1);
        assert_eq!(inventory.hyperlinks[0].target, "/ok");
    }

    #[test]
    fn test_decodes_targets() {
        let inventory = scan(r#"<a href="/search?a=1&amp;b=2">s</a>"#);
        assert_eq!(inventory.hyperlinks[0].target, "/search?a=1&b=2");
    }

    #[test]
    fn test_malformed_markup_still_scans() {
        let inventory = scan(r#"<p><a href="/one">one<div><a href="/two">two</p></span><img src="/x.png""#);
        assert!(inventory.hyperlinks.iter().any(|r| r.target == "/one"));
        assert!(inventory.hyperlinks.iter().any(|r| r.target == "/two"));
        assert!(inventory.parse_errors > 0);
    }

    #[test]
    fn test_long_context_is_windowed() {
        let before = "word ".repeat(40);
        let after = " more".repeat(40);
        let inventory = scan(&format!(r#"<p>{before}<a href="/x">the link</a>{after}</p>"#));
        let context = &inventory.hyperlinks[0].context;
        assert!(context.starts_with("..."));
        assert!(context.ends_with("..."));
        assert!(context.contains("the link"));
        assert!(context.chars().count() <= 50 + "the link".len() + 50 + 6);
    }

    #[rstest]
    #[case("short text", "text", 150, 50, "short text")]
    #[case("abcdefghij", "", 5, 2, "abcde...")]
    #[case("0123456789", "45", 5, 2, "...234567...")]
    #[case("0123456789", "01", 5, 2, "0123...")]
    #[case("0123456789", "zz", 5, 2, "01234...")]
    fn test_window(
        #[case] text: &str,
        #[case] needle: &str,
        #[case] budget: usize,
        #[case] padding: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(window(text, needle, budget, padding), expected);
    }

    #[rstest]
    #[case("div[")]
    #[case("li:last-child")]
    fn test_rejects_invalid_chrome_selector(#[case] css: &str) {
        let options = ScanOptions { chrome_selectors: vec!["nav".into(), css.into()], ..ScanOptions::default() };
        let err = Scanner::new(&options, TrackingFilter::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidSelector(css.into()));
    }

    #[test]
    fn test_scan_all_isolates_posts() {
        let mut corpus = Corpus::new();
        corpus.insert(Article::new("https://a.com/1", "1", "<p><a href=\"/a\">a</p></div></table>"));
        corpus.insert(Article::new("https://a.com/2", "2", "<p><a href=\"/b\">b</a></p>"));
        let inventories = Scanner::default().scan_all(&corpus);
        assert_eq!(inventories.len(), 2);
        assert_eq!(inventories[0].hyperlinks[0].target, "/a");
        assert_eq!(inventories[1].hyperlinks[0].target, "/b");
    }
}
