// src/crawl/driver.rs
// =============================================================================
// The crawl driver: checks every reference of every page exactly once.
//
// For each page the crawler hands us:
// 1. Collect its references, links first then assets, in page order
// 2. Check every URL the cache has not seen yet (concurrently, each once)
// 3. Store the outcomes in the cache
// 4. Walk the references again and append a failure record for each one
//    whose cached outcome is broken
// 5. Tell the caller whether to keep crawling
//
// The driver owns all run state (cache, ledger, cancellation token), so a
// new Driver is a fresh run with nothing left over from the previous one.
//
// Run states:
//   Running -> stop requested (Ctrl-C) -> current page drains -> Stopped
// =============================================================================

use super::queue::{Crawler, Page};
use crate::checker::{UrlChecker, VerificationCache};
use crate::error::CheckOutcome;
use crate::report::{display_path, FailureLedger, FailureRecord, Kind};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How many checks may be in flight at once within one page.
pub const DEFAULT_CONCURRENCY: usize = 8;

// Lets another task (the Ctrl-C handler) stop a run it does not own
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Aborts every in-flight check, makes every later check fail
    /// immediately, and ends the crawl after the current page.
    pub fn request_stop(&self) {
        self.0.cancel();
    }
}

// What the driver tells the crawl loop after a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Driver {
    checker: UrlChecker,
    start_url: String,
    cancel: CancellationToken,
    concurrency: usize,
    cache: VerificationCache,
    ledger: FailureLedger,
}

impl Driver {
    pub fn new(checker: UrlChecker, start_url: &str, cancel: CancellationToken) -> Self {
        Self {
            checker,
            start_url: start_url.to_string(),
            cancel,
            concurrency: DEFAULT_CONCURRENCY,
            cache: VerificationCache::new(),
            ledger: FailureLedger::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.cancel.clone())
    }

    #[cfg(test)]
    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Ends the run and hands back the failures, in discovery order.
    pub fn finish(self) -> FailureLedger {
        info!(
            checked = self.cache.len(),
            broken = self.ledger.len(),
            "run finished"
        );
        self.ledger
    }

    // Pulls pages from the crawler until it runs dry or a stop is requested
    //
    // A crawler error (a page that cannot be fetched) is returned as-is: it
    // is fatal for the run. Broken links never are, they end up in the ledger.
    pub async fn drive(&mut self, crawler: &mut Crawler) -> Result<()> {
        while let Some(page) = crawler.next_page().await? {
            if self.on_page(&page).await == Flow::Stop {
                info!(
                    broken = self.ledger().len(),
                    "stop requested, not crawling further"
                );
                break;
            }
        }
        Ok(())
    }

    // Checks all references of one page
    pub async fn on_page(&mut self, page: &Page) -> Flow {
        let references: Vec<(Kind, &str)> = page
            .links
            .iter()
            .map(|url| (Kind::Link, url.as_str()))
            .chain(page.assets.iter().map(|url| (Kind::Resource, url.as_str())))
            .collect();

        // Each unseen URL is checked once, even if this page repeats it.
        // The cache is only written below, after all checks are back, so
        // there is a single writer and no check-then-act race.
        let mut queued = HashSet::new();
        let misses: Vec<&str> = references
            .iter()
            .map(|(_, url)| *url)
            .filter(|url| self.cache.lookup(url).is_none() && queued.insert(*url))
            .collect();

        if !misses.is_empty() {
            debug!(page = %page.url, checks = misses.len(), "checking references");
        }

        let checker = &self.checker;
        let cancel = &self.cancel;
        let outcomes: Vec<(String, CheckOutcome)> = stream::iter(misses)
            .map(|url| async move { (url.to_string(), checker.check(url, cancel).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (url, outcome) in outcomes {
            self.cache.store(url, outcome);
        }

        let in_page = display_path(&page.url, &self.start_url);
        for (kind, url) in references {
            if let Some(Err(cause)) = self.cache.lookup(url) {
                self.ledger.append(FailureRecord {
                    in_page: in_page.clone(),
                    kind,
                    target: display_path(url, &self.start_url),
                    cause: cause.clone(),
                });
            }
        }

        if self.cancel.is_cancelled() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why collect outcomes before touching the cache?
//    - buffer_unordered finishes checks in any order
//    - Writing the cache afterwards keeps one writer (&mut self) and lets
//      the failure records be appended in page order, not finish order
//
// 2. Why clone the cause?
//    - The cache keeps the original forever
//    - Each failure record gets its own copy (an Arc bump for request errors)
// -----------------------------------------------------------------------------
