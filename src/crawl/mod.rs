// src/crawl/mod.rs
// =============================================================================
// This module handles walking the site and checking what it references.
//
// Submodules:
// - queue: Breadth-first crawler, hands out one Page at a time
// - driver: Checks each page's links and assets, owns the run state
//
// The crawler decides which pages exist; the driver decides which links
// are broken. Neither knows how the other works.
// =============================================================================

mod driver;
mod queue;

pub use driver::{Driver, DEFAULT_CONCURRENCY};
pub use queue::{build_page_client, prefix_scope, Crawler};
