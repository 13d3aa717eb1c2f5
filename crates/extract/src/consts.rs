use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

const MONTH_NAMES: &str = "january|february|march|april|may|june|july|august|september|october|november|december";

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! selectors {
    ($name:ident, [$($css:expr),+ $(,)?]) => {
        pub(crate) static $name: LazyLock<Vec<Selector>> =
            LazyLock::new(|| vec![$(Selector::parse($css).unwrap()),+]);
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Where the page says it lives.
selector!(CANONICAL_SELECTOR, "link[rel='canonical'][href]");
selector!(OG_URL_SELECTOR, "meta[property='og:url'][content]");

selector!(OG_TITLE_SELECTOR, "meta[property='og:title'][content]");
selector!(H1_SELECTOR, "h1");
selector!(TITLE_SELECTOR, "title");

selector!(AUTHOR_META_SELECTOR, "meta[name='author'][content]");
selector!(AUTHOR_REL_SELECTOR, "[rel='author']");

selector!(PUBLISHED_META_SELECTOR, "meta[property='article:published_time'][content]");
selector!(TIME_SELECTOR, "time[datetime]");
selector!(META_CONTAINER_SELECTOR, ".et_pb_title_meta_container");
regex!(
    LONG_DATE_REGEX,
    format!(r"(?i)\b({MONTH_NAMES})\s+(\d{{1,2}}),?\s+(\d{{4}})\b").as_str()
);
regex!(NUMERIC_DATE_REGEX, r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b");
regex!(ISO_DATE_REGEX, r"\b(\d{4})-(\d{2})-(\d{2})\b");
regex!(URL_DATE_REGEX, format!(r"/(\d{{4}})/({MONTH_NAMES})/(\d{{1,2}})(?:/|$)").as_str());

selector!(BODY_SELECTOR, "body");
selector!(ANCHOR_SELECTOR, "a");
selector!(CATEGORY_LINK_SELECTOR, "a[href*='/category/']");

// Sections holding a list of tag links.
selectors!(TAG_SECTION_SELECTORS, [".tags", ".tag-list", ".post-tags", "[class*='tag']", ".entry-tags"]);
// Category sources in priority order; `true` marks selectors that match the
// category anchors themselves rather than a section containing them.
pub(crate) static CATEGORY_SELECTORS: LazyLock<Vec<(Selector, bool)>> = LazyLock::new(|| {
    [
        (".et_pb_title_meta_container a", true),
        (".categories", false),
        (".category-list", false),
        (".post-categories", false),
        ("[class*='categor']", false),
        (".entry-categories", false),
        (".post-meta a[rel='category']", true),
        ("a[rel='category tag']", true),
        (".entry-meta a[href*='/category/']", true),
        ("span.cat-links a", true),
    ]
    .into_iter()
    .map(|(css, direct)| (Selector::parse(css).unwrap(), direct))
    .collect()
});

regex!(SLUG_INVALID_REGEX, r"[^A-Za-z0-9-]+");
regex!(SLUG_DASHES_REGEX, r"-{2,}");
regex!(WHITESPACE_REGEX, r"\s+");
