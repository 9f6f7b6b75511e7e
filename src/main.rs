// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap, set up logging
// 2. Work out the start URL (serving a local directory if needed)
// 3. Install the Ctrl-C handler
// 4. Crawl the site, checking every link and asset once
// 5. Print the failures and exit with the proper code
//    (0 = all good, 1 = broken links found, 2 = fatal error)
// =============================================================================

mod checker; // src/checker/ - is this URL reachable? (+ cache)
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - walking the site and checking each page
mod error; // src/error.rs - why a check failed
mod report; // src/report.rs - failure ledger and output
mod serve; // src/serve.rs - local static-file server

use anyhow::{Context, Result};
use checker::UrlChecker;
use clap::Parser;
use cli::{Cli, Target};
use crawl::{build_page_client, prefix_scope, Crawler, Driver};
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::{filter::Targets, prelude::*};
use url::Url;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so --json output on stdout stays clean.
// --verbose lets our own debug lines through (one per request/response and
// one per crawled page); dependencies stay at WARN either way.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), level)
        .with_default(Level::WARN);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = fatal error (bad target, start page unreachable...)
async fn run(cli: Cli) -> Result<i32> {
    let (start_url, server) = match Target::from_arg(cli.target.as_deref()) {
        Target::Url(url) => (url, None),
        Target::Dir(dir) => {
            let server = serve::serve_dir(&dir).await?;
            (server.url(), Some(server))
        }
    };

    let start_url = Url::parse(&start_url)
        .with_context(|| format!("invalid start URL {}", start_url))?
        .to_string();

    let page_client = build_page_client().context("failed to build HTTP client")?;
    let check_client = checker::build_client().context("failed to build HTTP client")?;
    let cancel = CancellationToken::new();

    let mut crawler = Crawler::new(page_client, &start_url, cancel.clone())?
        .with_scope(prefix_scope(&start_url))
        .with_max_depth(cli.max_depth);
    let mut driver = Driver::new(UrlChecker::new(check_client), &start_url, cancel)
        .with_concurrency(cli.concurrency);

    // Ctrl-C: stop after the current page and still report what we found
    let stop = driver.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing the current page");
            stop.request_stop();
        }
    });

    let crawled = driver.drive(&mut crawler).await;

    if let Some(server) = server {
        server.shutdown().await;
    }
    crawled?;

    let ledger = driver.finish();
    if cli.json {
        ledger.print_json()?;
    } else {
        ledger.print_text();
    }

    Ok(if ledger.is_empty() { 0 } else { 1 })
}
