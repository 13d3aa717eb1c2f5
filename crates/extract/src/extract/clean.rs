//! Token-level tidy-up of an extracted post body.
//!
//! The selected content element still carries the page builder's markup:
//! wrapper spans, inline styles, scripts, tracking beacons. One streaming
//! pass reduces it to the structure worth migrating.

use crate::error::{ErrorKind, Result};
use crate::models::TrackingFilter;
use exn::ResultExt;
use lol_html::{HtmlRewriter, Settings, element};
use url::Url;

/// Removed together with everything inside them.
const DROPPED: [&str; 3] = ["script", "style", "noscript"];
/// Replaced by their children.
const UNWRAPPED: [&str; 4] = ["span", "font", "center", "u"];

pub(crate) fn clean(html: &str, source: Option<&Url>, tracking: &TrackingFilter) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name().to_ascii_lowercase();
                if DROPPED.contains(&tag.as_str()) {
                    el.remove();
                    return Ok(());
                }
                if tag == "img" {
                    let src = el.get_attribute("src").unwrap_or_default();
                    let width = el.get_attribute("width");
                    let height = el.get_attribute("height");
                    if src.trim().is_empty() || tracking.is_tracking_image(&src, width.as_deref(), height.as_deref()) {
                        el.remove();
                        return Ok(());
                    }
                }
                if tag == "a"
                    && let (Some(source), Some(href)) = (source, el.get_attribute("href"))
                    && let Some(relative) = relativize(source, &href)
                {
                    el.set_attribute("href", &relative)?;
                }

                let keep: &[&str] = match tag.as_str() {
                    "a" => &["href"],
                    "img" => &["src", "alt"],
                    _ => &[],
                };
                let unwanted: Vec<String> = el
                    .attributes()
                    .iter()
                    .map(|attr| attr.name())
                    .filter(|name| !keep.contains(&name.as_str()))
                    .collect();
                for name in unwanted {
                    el.remove_attribute(&name);
                }

                match tag.as_str() {
                    "b" => el.set_tag_name("strong")?,
                    "i" => el.set_tag_name("em")?,
                    other if UNWRAPPED.contains(&other) => el.remove_and_keep_content(),
                    _ => {},
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if let Err(err) = rewriter.write(html.as_bytes()).and_then(|()| rewriter.end()) {
        let complaint = err.to_string();
        return Err(err).or_raise(|| ErrorKind::MalformedHtml(complaint));
    }

    // Input was a `&str` and the rewriter only ever inserts UTF-8.
    let cleaned = String::from_utf8_lossy(&output);
    Ok(format!("<div class=\"post-content\">\n{}\n</div>", cleaned.trim()))
}

/// Turns an absolute link back to the post's own site into a root-relative
/// one (`/path?query#fragment`), so it survives a domain move.
pub(crate) fn relativize(source: &Url, href: &str) -> Option<String> {
    let target = Url::parse(href.trim()).ok()?;
    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }
    match (target.host_str(), source.host_str()) {
        (Some(target_host), Some(source_host)) if target_host.eq_ignore_ascii_case(source_host) => {},
        _ => return None,
    }
    let mut relative = target.path().to_string();
    if let Some(query) = target.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = target.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    Some(relative)
}
