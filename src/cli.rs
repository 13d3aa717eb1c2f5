use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Migrate downloaded blog pages into WordPress WXR, rewriting hyperlinks
/// along the way.
///
/// Every command extracts the given pages afresh. Posts are numbered from 1 in
/// the order the pages are listed, and match ids take the form
/// `<post>:<occurrence>`.
#[derive(Parser, Debug)]
#[command(name = "rewire", author, version)]
pub struct Cli {
    /// Path to a configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct Pages {
    /// Downloaded HTML pages, one post each
    #[arg(required = true)]
    pub pages: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every distinct hyperlink target with how often it appears
    Links {
        #[command(flatten)]
        pages: Pages,
    },

    /// List the hyperlinks and images of each post
    Scan {
        #[command(flatten)]
        pages: Pages,

        /// Only scan this post
        #[arg(long)]
        post: Option<u64>,
    },

    /// Preview a hyperlink replacement and apply the selected matches
    Replace {
        #[command(flatten)]
        pages: Pages,

        /// Text (or regular expression with --regex) to find in hyperlink targets
        #[arg(long)]
        find: String,

        /// Replacement text; with --regex, `$1` refers to capture groups
        #[arg(long = "with")]
        replacement: String,

        /// Treat --find as a regular expression
        #[arg(long)]
        regex: bool,

        /// Only look at this post
        #[arg(long)]
        post: Option<u64>,

        /// Apply this match id; repeat to apply several
        #[arg(long = "select", action = ArgAction::Append, conflicts_with = "all")]
        select: Vec<String>,

        /// Apply every previewed match
        #[arg(long)]
        all: bool,

        /// Write the modified posts as WXR to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the unmodified posts as WXR to this file
        #[arg(long)]
        original: Option<PathBuf>,
    },

    /// Write the posts as WXR
    Export {
        #[command(flatten)]
        pages: Pages,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_replace() {
        let cli = Cli::try_parse_from([
            "rewire", "-vv", "replace", "a.html", "b.html", "--find", "old.com", "--with", "new.com", "--select",
            "1:0", "--select", "2:1", "-o", "out.xml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Replace { pages, find, replacement, select, all, output, .. } = cli.command else {
            panic!("expected replace");
        };
        assert_eq!(pages.pages.len(), 2);
        assert_eq!(find, "old.com");
        assert_eq!(replacement, "new.com");
        assert_eq!(select, vec!["1:0", "2:1"]);
        assert!(!all);
        assert_eq!(output, Some(PathBuf::from("out.xml")));
    }

    #[test]
    fn test_select_conflicts_with_all() {
        let parsed = Cli::try_parse_from([
            "rewire", "replace", "a.html", "--find", "x", "--with", "y", "--select", "1:0", "--all",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_pages_are_required() {
        assert!(Cli::try_parse_from(["rewire", "links"]).is_err());
    }
}
