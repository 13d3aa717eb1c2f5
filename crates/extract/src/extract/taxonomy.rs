use crate::consts;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Anything longer is a sentence that happens to be linked, not a term.
const MAX_TERM_CHARS: usize = 50;
/// Only the first few `/category/` links are trusted, later ones are usually navigation.
const MAX_FALLBACK_CATEGORIES: usize = 3;
/// Path segments that double as a category when nothing else is available.
const URL_CATEGORY_WORDS: [&str; 8] =
    ["news", "blog", "articles", "posts", "automotive", "luxury", "vehicles", "personal-injury"];

/// Tag and category lookup over a parsed page.
#[derive(Debug)]
pub struct Taxonomy<'a> {
    document: &'a Html,
}

/// Taxonomy Internals
impl<'a> Taxonomy<'a> {
    pub(crate) fn new(document: &'a Html) -> Self {
        Self { document }
    }

    fn term(anchor: ElementRef<'_>) -> Option<String> {
        let text = anchor.text().collect::<String>();
        let text = consts::WHITESPACE_REGEX.replace_all(text.trim(), " ");
        (!text.is_empty() && text.chars().count() < MAX_TERM_CHARS).then(|| text.into_owned())
    }

    fn section_terms(&self, selector: &Selector) -> Vec<String> {
        let Some(section) = self.document.select(selector).next() else {
            return Vec::new();
        };
        section
            .select(&consts::ANCHOR_SELECTOR)
            .filter(|anchor| anchor.value().attr("href").is_some())
            .filter_map(Self::term)
            .collect()
    }

    fn direct_terms(&self, selector: &Selector) -> Vec<String> {
        self.document.select(selector).filter_map(Self::term).collect()
    }

    fn dedup(terms: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        terms.into_iter().filter(|term| seen.insert(term.clone())).collect()
    }
}

/// Taxonomy Public
impl<'a> Taxonomy<'a> {
    /// Anchor texts of the first tag section that has any.
    pub fn tags(&self) -> Vec<String> {
        consts::TAG_SECTION_SELECTORS
            .iter()
            .map(|selector| self.section_terms(selector))
            .find(|terms| !terms.is_empty())
            .map(Self::dedup)
            .unwrap_or_default()
    }

    /// Categories from the first matching source, then `/category/` links,
    /// then a well-known word in the post URL.
    pub fn categories(&self, url: &str) -> Vec<String> {
        let found = consts::CATEGORY_SELECTORS
            .iter()
            .map(|(selector, direct)| {
                if *direct { self.direct_terms(selector) } else { self.section_terms(selector) }
            })
            .find(|terms| !terms.is_empty());
        if let Some(terms) = found {
            return Self::dedup(terms);
        }
        let linked = Self::dedup(
            self.document
                .select(&consts::CATEGORY_LINK_SELECTOR)
                .take(MAX_FALLBACK_CATEGORIES)
                .filter_map(Self::term)
                .collect(),
        );
        if !linked.is_empty() {
            return linked;
        }
        url.split('/')
            .find(|part| URL_CATEGORY_WORDS.contains(part))
            .map(|word| vec![title_case(&word.replace('-', " "))])
            .unwrap_or_default()
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_tags_from_first_populated_section() {
        let html = Html::parse_document(
            r#"<div class="tags"></div>
            <div class="post-tags"><a href="/tag/a">Alpha</a> <a href="/tag/b">Beta</a> <a href="/tag/a">Alpha</a></div>"#,
        );
        assert_eq!(Taxonomy::new(&html).tags(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_tags_ignore_overlong_text() {
        let long = "x".repeat(60);
        let html = Html::parse_document(&format!(r#"<div class="tags"><a href="/t">{long}</a><a href="/u">Short</a></div>"#));
        assert_eq!(Taxonomy::new(&html).tags(), vec!["Short"]);
    }

    #[test]
    fn test_categories_from_divi_meta() {
        let html = Html::parse_document(
            r#"<p class="et_pb_title_meta_container">by <a href="/author/x">Admin</a> | <a href="/category/news">News</a></p>"#,
        );
        assert_eq!(Taxonomy::new(&html).categories("https://example.com/p"), vec!["Admin", "News"]);
    }

    #[test]
    fn test_categories_from_category_links_are_capped() {
        let html = Html::parse_document(
            r#"<nav><a href="/category/one">One</a><a href="/category/two">Two</a>
            <a href="/category/three">Three</a><a href="/category/four">Four</a></nav>"#,
        );
        assert_eq!(Taxonomy::new(&html).categories("https://example.com/p"), vec!["One", "Two", "Three"]);
    }

    #[rstest]
    #[case("https://example.com/blog/some-post/", vec!["Blog"])]
    #[case("https://example.com/personal-injury/some-post/", vec!["Personal Injury"])]
    #[case("https://example.com/some-post/", vec![])]
    fn test_categories_from_url(#[case] url: &str, #[case] expected: Vec<&str>) {
        let html = Html::parse_document("<p>Nothing to see</p>");
        assert_eq!(Taxonomy::new(&html).categories(url), expected);
    }
}
