//! Search and preview of hyperlink replacements.
//!
//! A preview is a pure read of the corpus. Every hyperlink the [`Scanner`]
//! would list whose target matches the pattern yields exactly one
//! [`MatchCandidate`], with the replacement already computed, so an operator
//! can review the exact change before choosing which ones to
//! [`apply`](crate::apply()).
//!
//! Only hyperlink targets participate: image sources are never considered,
//! even when they contain the same URL. Links in site chrome, empty targets
//! and `#fragment` targets are skipped exactly as the scanner skips them.

use crate::corpus::{Corpus, Post, PostId};
use crate::error::{Error, ErrorKind, Result};
use crate::markup::Tokenizer;
use crate::scan::Scanner;
use exn::{OptionExt, ResultExt};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::instrument;

/// What to look for in hyperlink targets and what to put in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSpec {
    pub pattern: String,
    pub is_regex: bool,
    /// Replacement text; for regex patterns `$1`/`${name}` refer to capture groups.
    pub replacement: String,
}
impl SearchSpec {
    pub fn new(pattern: impl Into<String>, is_regex: bool, replacement: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), is_regex, replacement: replacement.into() }
    }

    pub fn literal(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::new(pattern, false, replacement)
    }

    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::new(pattern, true, replacement)
    }

    fn compile(&self) -> Result<Matcher> {
        if self.pattern.is_empty() {
            exn::bail!(ErrorKind::InvalidSearchSpec);
        }
        if !self.is_regex {
            return Ok(Matcher::Literal(self.pattern.clone()));
        }
        match Regex::new(&self.pattern) {
            Ok(regex) => Ok(Matcher::Regex(regex)),
            Err(err) => {
                let complaint = err.to_string();
                Err(err).or_raise(|| ErrorKind::InvalidPattern(complaint))
            },
        }
    }
}

#[derive(Debug)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}
impl Matcher {
    /// Replaces the first match in `href`, or returns `None` when there is none.
    fn replace_first(&self, href: &str, replacement: &str) -> Option<String> {
        match self {
            Self::Literal(pattern) => href.contains(pattern.as_str()).then(|| href.replacen(pattern.as_str(), replacement, 1)),
            Self::Regex(regex) => regex.is_match(href).then(|| regex.replace(href, replacement).into_owned()),
        }
    }
}

/// Which posts a preview looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    Post(PostId),
}

/// Handle for one proposed replacement: `{post_id}:{occurrence}`.
///
/// The occurrence counts candidates within the post in document order, so an
/// id stays meaningful for as long as the post is not changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId {
    pub post: PostId,
    pub occurrence: usize,
}
impl MatchId {
    pub fn new(post: PostId, occurrence: usize) -> Self {
        Self { post, occurrence }
    }
}
impl Display for MatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.post, self.occurrence)
    }
}
impl FromStr for MatchId {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (post, occurrence) = s.trim().split_once(':').ok_or_raise(|| ErrorKind::InvalidMatchId(s.to_string()))?;
        Ok(Self {
            post: post.parse::<PostId>().or_raise(|| ErrorKind::InvalidMatchId(s.to_string()))?,
            occurrence: occurrence.parse::<usize>().or_raise(|| ErrorKind::InvalidMatchId(s.to_string()))?,
        })
    }
}
impl Serialize for MatchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub match_id: MatchId,
    /// The decoded, trimmed `href` as it was when the preview ran.
    pub before: String,
    /// The decoded `href` the applier will write.
    pub after: String,
    pub link_text: String,
    /// Text around the link, as the scanner reports it.
    pub context: String,
    /// Ordinal of the `<a href>` tag within the post body.
    #[serde(skip)]
    pub(crate) anchor: usize,
}
impl MatchCandidate {
    pub fn post_id(&self) -> PostId {
        self.match_id.post
    }
}

/// The candidates of a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostMatches {
    pub post_id: PostId,
    pub post_title: String,
    pub source_url: String,
    /// Post revision the candidates were computed against.
    pub revision: u64,
    pub matches: Vec<MatchCandidate>,
}

/// A post that could not be previewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostFailure {
    pub post_id: PostId,
    pub reason: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    spec: SearchSpec,
    groups: Vec<PostMatches>,
    failures: Vec<PostFailure>,
    /// Apply re-reads posts with the same settings the preview used.
    #[serde(skip)]
    tokenizer: Tokenizer,
}
impl Preview {
    /// A preview that issued no ids; everything applied against it is stale.
    pub(crate) fn empty() -> Self {
        Self {
            spec: SearchSpec::literal("", ""),
            groups: Vec::new(),
            failures: Vec::new(),
            tokenizer: Tokenizer::default(),
        }
    }

    pub(crate) fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    /// Posts with at least one candidate, in corpus order.
    pub fn groups(&self) -> &[PostMatches] {
        &self.groups
    }

    pub fn failures(&self) -> &[PostFailure] {
        &self.failures
    }

    pub fn total_matches(&self) -> usize {
        self.groups.iter().map(|group| group.matches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every candidate, in preview order.
    pub fn candidates(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.groups.iter().flat_map(|group| group.matches.iter())
    }

    pub fn match_ids(&self) -> Vec<MatchId> {
        self.candidates().map(|candidate| candidate.match_id).collect()
    }

    pub fn group(&self, post: PostId) -> Option<&PostMatches> {
        self.groups.iter().find(|group| group.post_id == post)
    }

    pub fn find(&self, id: MatchId) -> Option<&MatchCandidate> {
        self.group(id.post)?.matches.iter().find(|candidate| candidate.match_id == id)
    }
}

/// Lists every hyperlink replacement `spec` would make within `scope`.
///
/// Hyperlinks are chosen the way `scanner` chooses them, so a preview never
/// proposes a change to a link the scan inventory does not list.
///
/// # Errors
///
/// Returns an error, and no partial results, if:
/// - The pattern is empty ([`ErrorKind::InvalidSearchSpec`])
/// - The regular expression does not compile ([`ErrorKind::InvalidPattern`])
/// - The scope names a post that is not in the corpus ([`ErrorKind::PostNotFound`])
///
/// Posts whose markup cannot be tokenized are listed in
/// [`Preview::failures`] instead.
#[instrument(skip(corpus, scanner), fields(posts = corpus.len()))]
pub fn preview(corpus: &Corpus, scanner: &Scanner, spec: &SearchSpec, scope: Scope) -> Result<Preview> {
    let matcher = spec.compile()?;
    let posts: Vec<&Post> = match scope {
        Scope::All => corpus.iter().collect(),
        Scope::Post(id) => vec![corpus.get(id).ok_or_raise(|| ErrorKind::PostNotFound(id))?],
    };

    let mut preview = Preview {
        spec: spec.clone(),
        groups: Vec::new(),
        failures: Vec::new(),
        tokenizer: scanner.tokenizer().clone(),
    };
    for post in posts {
        match candidates(post, scanner, &matcher, &spec.replacement) {
            Ok(matches) if matches.is_empty() => {},
            Ok(matches) => preview.groups.push(PostMatches {
                post_id: post.id(),
                post_title: post.title().to_string(),
                source_url: post.source_url().to_string(),
                revision: post.revision(),
                matches,
            }),
            Err(err) => {
                tracing::warn!(post_id = %post.id(), error = %err, "skipping post with unparsable content");
                preview.failures.push(PostFailure { post_id: post.id(), reason: ErrorKind::UnparsableContent(post.id()) });
            },
        }
    }
    tracing::info!(total_matches = preview.total_matches(), posts_matched = preview.groups.len(), "preview ready");
    Ok(preview)
}

fn candidates(post: &Post, scanner: &Scanner, matcher: &Matcher, replacement: &str) -> Result<Vec<MatchCandidate>> {
    let anchors =
        scanner.tokenizer().anchors(post.current_body()).or_raise(|| ErrorKind::UnparsableContent(post.id()))?;
    let mut matches = Vec::new();
    for anchor in anchors {
        let href = anchor.href.trim();
        if anchor.chrome || href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Some(after) = matcher.replace_first(href, replacement) else {
            continue;
        };
        if after == href {
            continue;
        }
        matches.push(MatchCandidate {
            match_id: MatchId::new(post.id(), matches.len()),
            before: href.to_string(),
            after,
            link_text: anchor.text,
            context: String::new(),
            anchor: anchor.ordinal,
        });
    }
    if !matches.is_empty() {
        attach_context(post, scanner, &mut matches);
    }
    Ok(matches)
}

/// Copies each candidate's context from the scan inventory, pairing links
/// with the same target in document order.
fn attach_context(post: &Post, scanner: &Scanner, matches: &mut [MatchCandidate]) {
    let inventory = scanner.scan(post);
    let mut contexts: HashMap<&str, VecDeque<&str>> = HashMap::new();
    for link in &inventory.hyperlinks {
        contexts.entry(link.target.as_str()).or_default().push_back(link.context.as_str());
    }
    for candidate in matches {
        if let Some(context) = contexts.get_mut(candidate.before.as_str()).and_then(VecDeque::pop_front) {
            candidate.context = context.to_string();
        }
    }
}
