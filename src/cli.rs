// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   linkwalk                      check ./public
//   linkwalk ./site               serve ./site locally and check it
//   linkwalk https://example.com  check a live site
//
// Flags only change how much we print or how hard we work, never what
// counts as broken.
// =============================================================================

use crate::crawl::DEFAULT_CONCURRENCY;
use clap::Parser;
use std::path::PathBuf;

/// Directory checked when no target is given
pub const DEFAULT_DIR: &str = "public";

#[derive(Parser, Debug)]
#[command(
    name = "linkwalk",
    version,
    about = "Walk a whole site and report every broken link and asset",
    long_about = "linkwalk crawls every page under the start URL (or a local directory it serves \
                  itself) and checks that each link and asset answers 200 OK. Each URL is \
                  checked once; every page that references a broken URL is reported. \
                  Exits 1 when anything is broken, 2 on fatal errors."
)]
pub struct Cli {
    /// Local directory or http(s):// URL to check [default: ./public]
    pub target: Option<String>,

    /// Log every HTTP request and response, and every crawled page
    #[arg(short, long)]
    pub verbose: bool,

    /// Print failures as a JSON array on stdout instead of text lines
    #[arg(long)]
    pub json: bool,

    /// Stop following links after this many levels (1 = start page only)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Maximum number of links checked at the same time within a page
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

// What the positional argument resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    Dir(PathBuf),
}

impl Target {
    // Anything starting with http:// or https:// is a URL, everything else
    // is a directory path
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("") => Target::Dir(PathBuf::from(DEFAULT_DIR)),
            Some(a) if a.starts_with("http://") || a.starts_with("https://") => {
                Target::Url(a.to_string())
            }
            Some(a) => Target::Dir(PathBuf::from(a)),
        }
    }
}
