//! WordPress eXtended RSS (WXR 1.2) serialization of a migrated corpus.
//!
//! Either version of every post can be exported: the body as extracted
//! ([`Variant::Original`]) or with all applied replacements
//! ([`Variant::Modified`]). Items follow corpus order.

mod addons;
mod assets;
pub mod error;
mod sanitize;

use crate::assets::Builtins;
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use rewire_library::{Corpus, Post};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc2822;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::instrument;
use upon::{Engine, Template};

/// Channel-level metadata written into every export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub site_title: String,
    pub site_url: String,
    pub description: String,
    pub language: String,
    /// Used as `dc:creator` for posts without a known author.
    pub author: String,
}
impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            site_title: "Migrated Blog".to_string(),
            site_url: "https://newsite.com".to_string(),
            description: "Migrated content".to_string(),
            language: "en-US".to_string(),
            author: "Unknown".to_string(),
        }
    }
}

/// Which body of each post goes into the export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum Variant {
    #[display("original")]
    Original,
    #[default]
    #[display("modified")]
    Modified,
}

pub struct Exporter {
    engine: Engine<'static>,
    template: Template<'static>,
    options: ExportOptions,
    timestamp: Option<OffsetDateTime>,
}
impl Exporter {
    /// Compiles the builtin WXR template.
    pub fn new(options: ExportOptions) -> Result<Self> {
        let source = Builtins::template("wxr.xml")?;
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(source).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template, options, timestamp: None })
    }

    /// Fixes the channel `pubDate` instead of using the time of rendering.
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Renders the whole corpus as one WXR document.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Empty`] when the corpus has no posts, and
    /// [`ErrorKind::Template`] if rendering fails.
    #[instrument(skip_all, fields(posts = corpus.len(), %variant))]
    pub fn render(&self, corpus: &Corpus, variant: Variant) -> Result<String> {
        if corpus.is_empty() {
            exn::bail!(ErrorKind::Empty);
        }
        let document = Document {
            site: Site {
                title: &self.options.site_title,
                url: &self.options.site_url,
                description: &self.options.description,
                language: &self.options.language,
                pub_date: rfc2822(self.timestamp.unwrap_or_else(OffsetDateTime::now_utc)),
            },
            items: corpus.iter().enumerate().map(|(n, post)| self.item(n + 1, post, variant)).collect(),
        };
        let xml = self.template.render(&self.engine, &document).to_string().or_raise(|| ErrorKind::Template)?;
        tracing::info!(items = document.items.len(), bytes = xml.len(), "WXR rendered");
        Ok(xml)
    }

    fn item<'a>(&'a self, position: usize, post: &'a Post, variant: Variant) -> Item<'a> {
        let details = post.details();
        let body = match variant {
            Variant::Original => post.original_body(),
            Variant::Modified => post.current_body(),
        };
        let terms = details
            .tags
            .iter()
            .map(|name| Term { domain: "post_tag", name })
            .chain(details.categories.iter().map(|name| Term { domain: "category", name }))
            .collect();
        Item {
            title: post.title(),
            link: post.source_url(),
            pub_date: details.published.map(rfc2822).unwrap_or_default(),
            creator: details.author.as_deref().unwrap_or(&self.options.author),
            content: sanitize::content(body),
            post_id: position,
            post_date: details.published.map(post_date).unwrap_or_default(),
            post_date_gmt: details.published.map(|at| post_date(at.to_offset(UtcOffset::UTC))).unwrap_or_default(),
            slug: &details.slug,
            terms,
        }
    }
}

#[derive(Serialize)]
struct Document<'a> {
    site: Site<'a>,
    items: Vec<Item<'a>>,
}

#[derive(Serialize)]
struct Site<'a> {
    title: &'a str,
    url: &'a str,
    description: &'a str,
    language: &'a str,
    pub_date: String,
}

#[derive(Serialize)]
struct Item<'a> {
    title: &'a str,
    link: &'a str,
    pub_date: String,
    creator: &'a str,
    content: String,
    post_id: usize,
    post_date: String,
    post_date_gmt: String,
    slug: &'a str,
    terms: Vec<Term<'a>>,
}

#[derive(Serialize)]
struct Term<'a> {
    domain: &'static str,
    name: &'a str,
}

fn rfc2822(at: OffsetDateTime) -> String {
    // Only fails for years before 1900.
    at.to_offset(UtcOffset::UTC).format(&Rfc2822).unwrap_or_default()
}

fn post_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")).unwrap_or_default()
}
