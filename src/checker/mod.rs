// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - http: One bounded GET per URL, 200 or it is broken
// - cache: Remembers every outcome so a URL is checked at most once per run
//
// Page fetching and link extraction live in crate::crawl, this module only
// answers "is this URL reachable?".
// =============================================================================

mod cache;
mod http;

pub use cache::VerificationCache;
pub use http::{build_client, UrlChecker};
