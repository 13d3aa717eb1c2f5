//! Token-level access to the hyperlinks of a post body.
//!
//! Both the match engine and the applier walk `<a href>` start tags through
//! the same streaming tokenizer, so the ordinal of a tag seen at preview time
//! is the ordinal the applier finds again. Rewrites touch only the `href`
//! attribute value; every other byte of the document is passed through.
//!
//! Attribute values come out of the tokenizer raw. Comparisons happen on the
//! entity-decoded value, and replacement values are re-encoded before they go
//! back into the attribute.

use lol_html::errors::RewritingError;
use lol_html::html_content::{Element, EndTag};
use lol_html::{HandlerResult, HtmlRewriter, MemorySettings, Settings, element, text};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const PARSING_BUFFER: usize = 1024;

/// One `<a href>` start tag, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub ordinal: usize,
    /// Entity-decoded `href` value.
    pub href: String,
    /// Entity-decoded, whitespace-collapsed text inside the element.
    pub text: String,
    /// Whether the tag sits inside (or is) a site chrome element.
    pub chrome: bool,
}

/// Result of a rewriting pass.
#[derive(Debug)]
pub(crate) struct Rewrite {
    pub html: String,
    /// Number of `<a href>` tags seen while rewriting.
    pub anchors: usize,
}

pub(crate) fn decode(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

fn encode(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenizer settings shared by the match engine and the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tokenizer {
    /// Selectors of site chrome. Each must already be known to parse.
    chrome: Vec<String>,
    /// Bytes the tokenizer may hold for a single document.
    max_memory: usize,
}
impl Default for Tokenizer {
    fn default() -> Self {
        Self { chrome: Vec::new(), max_memory: usize::MAX }
    }
}
impl Tokenizer {
    pub fn new(chrome: Vec<String>, max_memory: usize) -> Self {
        Self { chrome, max_memory }
    }

    fn memory(&self) -> MemorySettings {
        MemorySettings {
            preallocated_parsing_buffer_size: PARSING_BUFFER.min(self.max_memory),
            max_allowed_memory_usage: self.max_memory,
        }
    }

    /// Lists every `<a href>` in the document, flagging those inside chrome.
    pub fn anchors(&self, html: &str) -> Result<Vec<Anchor>, RewritingError> {
        let found: RefCell<Vec<Anchor>> = RefCell::new(Vec::new());
        let depth = Rc::new(Cell::new(0_usize));
        // Element handlers run in registration order, so chrome is entered
        // before an anchor that is itself a chrome element gets recorded.
        let mut handlers: Vec<_> = self.chrome.iter().map(|css| element!(css.as_str(), enter(&depth))).collect();
        handlers.push(element!("a[href]", |el| {
            let href = el.get_attribute("href").unwrap_or_default();
            let mut found = found.borrow_mut();
            let ordinal = found.len();
            found.push(Anchor { ordinal, href: decode(&href), text: String::new(), chrome: depth.get() > 0 });
            Ok(())
        }));
        handlers.push(text!("a[href]", |chunk| {
            if let Some(anchor) = found.borrow_mut().last_mut() {
                anchor.text.push_str(chunk.as_str());
            }
            Ok(())
        }));
        let mut rewriter = HtmlRewriter::new(
            Settings { element_content_handlers: handlers, memory_settings: self.memory(), ..Settings::default() },
            |_: &[u8]| {},
        );
        rewriter.write(html.as_bytes())?;
        rewriter.end()?;

        let mut anchors = found.into_inner();
        for anchor in &mut anchors {
            anchor.text = collapse_whitespace(&decode(&anchor.text));
        }
        Ok(anchors)
    }

    /// Streams the document, asking `decide` about every `<a href>` in order.
    ///
    /// `decide` receives the tag's ordinal and its decoded `href`, and returns
    /// the new decoded value when the attribute should change.
    pub fn rewrite_hrefs<F>(&self, html: &str, mut decide: F) -> Result<Rewrite, RewritingError>
    where
        F: FnMut(usize, &str) -> Option<String>,
    {
        let mut output = Vec::with_capacity(html.len());
        let seen = Cell::new(0_usize);
        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("a[href]", |el| {
                    let ordinal = seen.get();
                    seen.set(ordinal + 1);
                    let href = decode(&el.get_attribute("href").unwrap_or_default());
                    if let Some(replacement) = decide(ordinal, &href) {
                        el.set_attribute("href", &encode(&replacement))?;
                    }
                    Ok(())
                })],
                memory_settings: self.memory(),
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );
        rewriter.write(html.as_bytes())?;
        rewriter.end()?;

        // Input was a `&str` and only UTF-8 attribute values are written back.
        let html = String::from_utf8_lossy(&output).into_owned();
        Ok(Rewrite { html, anchors: seen.get() })
    }
}

/// Counts open chrome elements; the count drops again at their end tag.
fn enter(depth: &Rc<Cell<usize>>) -> impl FnMut(&mut Element<'_, '_>) -> HandlerResult + 'static {
    let depth = Rc::clone(depth);
    move |el: &mut Element<'_, '_>| -> HandlerResult {
        if let Some(handlers) = el.end_tag_handlers() {
            depth.set(depth.get() + 1);
            let depth = Rc::clone(&depth);
            handlers.push(Box::new(move |_: &mut EndTag<'_>| -> HandlerResult {
                depth.set(depth.get().saturating_sub(1));
                Ok(())
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_in_document_order() {
        let html = r#"<p>See <a href="https://a.com/1">first   link</a> and <a class="x" href="/two">second</a>.</p>
            <a name="anchor-only">no href</a><a href="">empty</a>"#;
        let found = Tokenizer::default().anchors(html).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], Anchor { ordinal: 0, href: "https://a.com/1".into(), text: "first link".into(), chrome: false });
        assert_eq!(found[1].href, "/two");
        assert_eq!(found[1].text, "second");
        assert_eq!(found[2].href, "");
    }

    #[test]
    fn test_anchors_decode_entities() {
        let found = Tokenizer::default().anchors(r#"<a href="/search?a=1&amp;b=2">Fish &amp; Chips</a>"#).unwrap();
        assert_eq!(found[0].href, "/search?a=1&b=2");
        assert_eq!(found[0].text, "Fish & Chips");
    }

    #[test]
    fn test_rewrite_touches_only_chosen_href() {
        let html = r#"<div class="post-content"><a href="http://old.com/a" title="x">A</a> <a href="http://old.com/b">B</a></div>"#;
        let rewrite = Tokenizer::default().rewrite_hrefs(html, |ordinal, href| (ordinal == 1).then(|| href.replace("old", "new"))).unwrap();
        assert_eq!(rewrite.anchors, 2);
        assert_eq!(
            rewrite.html,
            r#"<div class="post-content"><a href="http://old.com/a" title="x">A</a> <a href="http://new.com/b">B</a></div>"#
        );
    }

    #[test]
    fn test_rewrite_without_changes_is_byte_identical() {
        let html = "<p>Odd <b>markup <i>kept</b> as-is</i>\n<a href='x'>x</a><!-- note --></p>";
        let rewrite = Tokenizer::default().rewrite_hrefs(html, |_, _| None).unwrap();
        assert_eq!(rewrite.html, html);
        assert_eq!(rewrite.anchors, 1);
    }

    #[test]
    fn test_rewrite_encodes_replacement() {
        let rewrite = Tokenizer::default().rewrite_hrefs(r#"<a href="/old">x</a>"#, |_, _| Some("/new?a=1&b=\"2\"".into())).unwrap();
        let found = Tokenizer::default().anchors(&rewrite.html).unwrap();
        assert_eq!(found[0].href, "/new?a=1&b=\"2\"");
    }

    fn chrome() -> Tokenizer {
        Tokenizer::new(vec!["nav".into(), ".menu".into(), "[role='navigation']".into()], usize::MAX)
    }

    #[test]
    fn test_flags_anchors_inside_chrome() {
        let html = r#"<nav><ul><li><a href="/home">Home</a></li></ul></nav>
            <p><a href="/post">Post</a></p>
            <div role="navigation"><nav><a href="/nested">n</a></nav><a href="/still">s</a></div>
            <a class="menu" href="/self">self</a><a href="/after">after</a>"#;
        let flags: Vec<_> = chrome().anchors(html).unwrap().into_iter().map(|a| (a.href, a.chrome)).collect();
        assert_eq!(
            flags,
            vec![
                ("/home".to_string(), true),
                ("/post".to_string(), false),
                ("/nested".to_string(), true),
                ("/still".to_string(), true),
                ("/self".to_string(), true),
                ("/after".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_ordinals_count_chrome_anchors() {
        let found = chrome().anchors(r#"<nav><a href="/a">a</a></nav><a href="/b">b</a>"#).unwrap();
        assert_eq!(found[1].ordinal, 1);
        assert!(!found[1].chrome);
    }

    #[test]
    fn test_memory_bound_fails_the_document() {
        let tokenizer = Tokenizer::new(Vec::new(), 16 * 1024);
        let deep = format!("{}<a href=\"/x\">x</a>", "<div>".repeat(5000));
        assert!(tokenizer.anchors(r#"<p><a href="/x">x</a></p>"#).is_ok());
        assert!(matches!(tokenizer.anchors(&deep), Err(RewritingError::MemoryLimitExceeded(_))));
        assert!(tokenizer.rewrite_hrefs(&deep, |_, _| None).is_err());
    }
}
