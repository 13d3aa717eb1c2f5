//! # rewire
//!
//! Migrates downloaded blog pages into a WordPress WXR import file, with
//! selective rewriting of the hyperlinks inside each post.
//!
//! ```bash
//! # What do the posts link to?
//! rewire links pages/*.html
//!
//! # Preview a replacement, then apply two of the matches and export
//! rewire replace pages/*.html --find http://old.com --with https://new.com
//! rewire replace pages/*.html --find http://old.com --with https://new.com \
//!     --select 1:0 --select 3:2 --output modified.xml --original original.xml
//! ```

mod cli;
mod commands;
mod error;

use crate::cli::Cli;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", *err);
            tracing::debug!(error = ?err, "command failed");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
