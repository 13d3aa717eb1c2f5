//! Makes post bodies safe to embed in an XML document.

use regex::Regex;
use std::sync::LazyLock;

static BLANK_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href=(?:"\s*"|'\s*')"#).unwrap());

/// Characters allowed by the XML 1.0 `Char` production.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Points blank `href`s at the site root and drops characters XML cannot carry.
pub(crate) fn content(html: &str) -> String {
    BLANK_HREF.replace_all(html, r#"href="/""#).chars().filter(|c| is_xml_char(*c)).collect()
}
