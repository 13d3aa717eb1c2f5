use crate::cli::{Cli, Commands, Pages};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rewire_config::Config;
use rewire_export::{Exporter, Variant};
use rewire_extract::models::Article;
use rewire_library::{ApplyReport, LinkSummary, MatchId, PostId, Preview, ReferenceInventory, Scope, Session};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match &cli.command {
        Commands::Links { pages } => {
            let session = load(pages, &config)?;
            print_links(&session.link_summary(), cli.json)
        },
        Commands::Scan { pages, post } => {
            let session = load(pages, &config)?;
            let inventories = match post {
                Some(id) => vec![session.scan_post(PostId::from(*id)).or_raise(|| ErrorKind::Library)?],
                None => session.scan_all(),
            };
            print_inventories(&session, &inventories, cli.json)
        },
        Commands::Replace { pages, find, replacement, regex, post, select, all, output, original } => {
            let mut session = load(pages, &config)?;
            let scope = post.map_or(Scope::All, |id| Scope::Post(PostId::from(id)));
            let preview =
                session.preview_replace(find, *regex, replacement, scope).or_raise(|| ErrorKind::Library)?.clone();
            let selected = if *all { preview.match_ids() } else { parse_selection(select)? };
            let report = (!selected.is_empty()).then(|| session.apply_replace(&selected));
            print_replace(&preview, report.as_ref(), cli.json)?;

            let exporter = Exporter::new(config.export.clone()).or_raise(|| ErrorKind::Export)?;
            if let Some(path) = output {
                write_wxr(&exporter, &session, Variant::Modified, path)?;
            }
            if let Some(path) = original {
                write_wxr(&exporter, &session, Variant::Original, path)?;
            }
            Ok(())
        },
        Commands::Export { pages, output } => {
            let session = load(pages, &config)?;
            let exporter = Exporter::new(config.export.clone()).or_raise(|| ErrorKind::Export)?;
            write_wxr(&exporter, &session, Variant::Modified, output)
        },
    }
}

/// Extracts every page into a fresh session. Pages that fail are reported and
/// skipped.
#[instrument(skip_all, fields(pages = pages.pages.len()))]
fn load(pages: &Pages, config: &Config) -> Result<Session> {
    let mut session = Session::new(config.scanner().or_raise(|| ErrorKind::Config)?);
    for path in &pages.pages {
        match read_article(path, config) {
            Ok(article) => {
                let id = session.ingest(article);
                tracing::info!(post_id = %id, path = %path.display(), "post extracted");
            },
            Err(err) => {
                tracing::debug!(error = ?err, "extraction failed");
                eprintln!("skipping {}: {}", path.display(), *err);
            },
        }
    }
    if session.corpus().is_empty() {
        exn::bail!(ErrorKind::NoPages);
    }
    Ok(session)
}

fn read_article(path: &Path, config: &Config) -> Result<Article> {
    let html = fs::read_to_string(path).or_raise(|| ErrorKind::Read(path.to_path_buf()))?;
    // Pages without a canonical URL are known by where they were read from.
    let fallback = fs::canonicalize(path).ok().and_then(|path| Url::from_file_path(path).ok()).map(String::from);
    rewire_extract::extract(&html, fallback.as_deref(), &config.extract, &config.tracking)
        .or_raise(|| ErrorKind::Extract(path.to_path_buf()))
}

fn parse_selection(select: &[String]) -> Result<Vec<MatchId>> {
    select
        .iter()
        .flat_map(|value| value.split(','))
        .filter(|id| !id.trim().is_empty())
        .map(|id| id.parse::<MatchId>().or_raise(|| ErrorKind::Usage(format!("invalid match id: {id:?}"))))
        .collect()
}

fn write_wxr(exporter: &Exporter, session: &Session, variant: Variant, path: &PathBuf) -> Result<()> {
    let xml = exporter.render(session.corpus(), variant).or_raise(|| ErrorKind::Export)?;
    fs::write(path, xml).or_raise(|| ErrorKind::Write(path.clone()))?;
    eprintln!("wrote {variant} posts to {}", path.display());
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    Ok(())
}

fn print_links(summary: &[LinkSummary], json: bool) -> Result<()> {
    if json {
        return print_json(&summary);
    }
    for link in summary {
        println!("{:>5}  {:<8}  {}", link.count, link.scope, link.target);
        let seen = &link.first_seen;
        println!("       \"{}\" in {} ({})", seen.anchor_text, seen.post_title, seen.source_url);
    }
    println!("{} distinct targets", summary.len());
    Ok(())
}

fn print_inventories(session: &Session, inventories: &[ReferenceInventory], json: bool) -> Result<()> {
    if json {
        return print_json(&inventories);
    }
    for inventory in inventories {
        let title = session.corpus().get(inventory.post_id).map(|post| post.title()).unwrap_or_default();
        println!("Post {}: {title}", inventory.post_id);
        for link in &inventory.hyperlinks {
            let scope = link.scope.map(|scope| scope.to_string()).unwrap_or_default();
            println!("  link   {scope:<8}  {}  \"{}\"", link.target, link.anchor_text.as_deref().unwrap_or_default());
        }
        for image in &inventory.images {
            println!("  image            {}", image.target);
        }
        println!(
            "  {} links, {} images, {} skipped as site chrome, {} tracking images, {} markup errors",
            inventory.hyperlinks.len(),
            inventory.images.len(),
            inventory.dropped_chrome,
            inventory.dropped_tracking,
            inventory.parse_errors,
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ReplaceOutput<'a> {
    preview: &'a Preview,
    report: Option<&'a ApplyReport>,
}

fn print_replace(preview: &Preview, report: Option<&ApplyReport>, json: bool) -> Result<()> {
    if json {
        return print_json(&ReplaceOutput { preview, report });
    }
    for group in preview.groups() {
        println!("Post {}: {} ({})", group.post_id, group.post_title, group.source_url);
        for candidate in &group.matches {
            println!("  {:<7} {} -> {}  \"{}\"", candidate.match_id, candidate.before, candidate.after, candidate.link_text);
            if !candidate.context.is_empty() {
                println!("          {}", candidate.context);
            }
        }
    }
    for failure in preview.failures() {
        println!("Post {}: {}", failure.post_id, failure.reason);
    }
    println!("{} matches in {} posts", preview.total_matches(), preview.groups().len());

    let Some(report) = report else {
        if !preview.is_empty() {
            println!("nothing applied; pass --select <ID> or --all");
        }
        return Ok(());
    };
    println!("applied {} changes", report.changes_made);
    for id in report.stale() {
        println!("  stale: {id}");
    }
    for outcome in report.failed() {
        let reason = outcome.error.as_ref().map(ToString::to_string).unwrap_or_default();
        println!("  failed: post {} ({reason})", outcome.post_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><head>
<title>Spring Fair - Old Blog</title>
<link rel="canonical" href="https://oldblog.com/2024/march/16/spring-fair/">
</head><body><article>
<h1>Spring Fair</h1>
<p>Our annual spring fair returns with stalls, music and food. Read the <a href="http://old.com/map">map</a>
before you come, and check <a href="https://oldblog.com/parking/">parking</a> too.</p>
</article></body></html>"#;

    #[rstest]
    #[case(&["1:0"], vec![MatchId::new(PostId::from(1), 0)])]
    #[case(&["1:0,2:3", " 4:1 "], vec![MatchId::new(PostId::from(1), 0), MatchId::new(PostId::from(2), 3), MatchId::new(PostId::from(4), 1)])]
    #[case(&[], vec![])]
    fn test_parse_selection(#[case] input: &[&str], #[case] expected: Vec<MatchId>) {
        let input: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_selection(&input).unwrap(), expected);
    }

    #[test]
    fn test_parse_selection_rejects_garbage() {
        let err = parse_selection(&["1-0".to_string()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Usage(_)));
    }

    #[test]
    fn test_load_skips_unreadable_pages() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("spring.html");
        fs::write(&good, PAGE).unwrap();
        let pages = Pages { pages: vec![dir.path().join("missing.html"), good] };

        let session = load(&pages, &Config::default()).unwrap();
        assert_eq!(session.corpus().len(), 1);
        let post = session.corpus().iter().next().unwrap();
        assert_eq!(post.title(), "Spring Fair");
        assert_eq!(post.source_url(), "https://oldblog.com/2024/march/16/spring-fair/");
        assert!(post.current_body().contains(r#"<a href="/parking/">parking</a>"#));
    }

    #[test]
    fn test_load_with_nothing_usable() {
        let dir = TempDir::new().unwrap();
        let pages = Pages { pages: vec![dir.path().join("missing.html")] };
        let err = load(&pages, &Config::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::NoPages);
    }

    #[test]
    fn test_replace_and_export() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("spring.html");
        fs::write(&page, PAGE).unwrap();
        let mut session = load(&Pages { pages: vec![page] }, &Config::default()).unwrap();

        let preview = session.preview_replace("old.com/map", false, "new.com/map", Scope::All).unwrap();
        assert!(preview.candidates().all(|candidate| candidate.context.contains("Read the map before you come")));
        let ids = preview.match_ids();
        assert_eq!(session.apply_replace(&ids).changes_made, 1);

        let exporter = Exporter::new(Config::default().export).unwrap();
        let modified = dir.path().join("modified.xml");
        let original = dir.path().join("original.xml");
        write_wxr(&exporter, &session, Variant::Modified, &modified).unwrap();
        write_wxr(&exporter, &session, Variant::Original, &original).unwrap();
        assert!(fs::read_to_string(&modified).unwrap().contains(r#"href="http://new.com/map""#));
        assert!(fs::read_to_string(&original).unwrap().contains(r#"href="http://old.com/map""#));
    }
}
