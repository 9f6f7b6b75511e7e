// src/crawl/queue.rs
// =============================================================================
// This module walks a site breadth-first and hands out one page at a time.
//
// How it works:
// 1. Start with the start URL in a queue
// 2. Fetch the page HTML
// 3. Extract links (<a href>) and assets (img, script, link, source, iframe)
// 4. Queue links that are in scope and not yet visited
// 5. Give the page to the caller, who checks its references
// 6. Repeat until the queue is empty, the depth limit is hit, or the run
//    is cancelled
//
// Pull-based: the caller asks for the next page with next_page() and simply
// stops asking when it wants the crawl to end.
//
// Rust concepts:
// - HashSet: To track visited URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// - Box<dyn Fn>: The scope rule is a closure the caller can replace
// =============================================================================

use anyhow::{anyhow, Context, Result};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Client-level timeout for page fetches.
const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Decides whether a discovered page URL may be fetched and traversed.
pub type ScopeFn = Box<dyn Fn(&Url) -> bool + Send + Sync>;

// One fetched page and everything it references, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub links: Vec<String>,
    pub assets: Vec<String>,
}

// Represents a page in the crawl queue
#[derive(Debug, Clone)]
struct CrawlItem {
    url: Url,
    depth: usize, // 1 = the start page
}

// Scope rule used by the checker: a page is in scope when its URL starts
// with the start URL.
pub fn prefix_scope(start_url: &str) -> ScopeFn {
    let prefix = start_url.to_string();
    Box::new(move |url: &Url| url.as_str().starts_with(&prefix))
}

// Builds the client used to fetch pages
//
// Unlike the link checker's client this one follows redirects, so a start
// URL like https://host/docs that redirects to /docs/ still gets crawled.
pub fn build_page_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("linkwalk/", env!("CARGO_PKG_VERSION")))
        .timeout(PAGE_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

pub struct Crawler {
    client: Client,
    in_scope: ScopeFn,
    max_depth: Option<usize>,
    cancel: CancellationToken,
    queue: VecDeque<CrawlItem>,
    visited: HashSet<String>,
}

impl Crawler {
    // Creates a crawler seeded with the start URL
    //
    // The default scope is prefix_scope() of the parsed start URL, so
    // "http://host:4000" scopes to "http://host:4000/" and not to port 40001.
    pub fn new(client: Client, start_url: &str, cancel: CancellationToken) -> Result<Self> {
        let start = Url::parse(start_url)
            .map_err(|e| anyhow!("Invalid URL '{}': {}", start_url, e))?;

        let in_scope = prefix_scope(start.as_str());

        let mut visited = HashSet::new();
        visited.insert(start.to_string());

        let mut queue = VecDeque::new();
        queue.push_back(CrawlItem {
            url: start,
            depth: 1,
        });

        Ok(Self {
            client,
            in_scope,
            max_depth: None,
            cancel,
            queue,
            visited,
        })
    }

    pub fn with_scope(mut self, in_scope: ScopeFn) -> Self {
        self.in_scope = in_scope;
        self
    }

    /// None means no depth limit.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    // Fetches the next page of the crawl
    //
    // Returns:
    //   Ok(Some(page)) = a page was fetched
    //   Ok(None)       = nothing left to crawl, or the run was cancelled
    //   Err            = a page could not be fetched or read (fatal)
    //
    // A non-200 answer is fatal only for the start page. Any other page that
    // answers non-200 is a link target of an earlier page, so the driver has
    // already recorded it as broken; it comes back as a page with no
    // references and the crawl goes on.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(item) = self.queue.pop_front() else {
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(None),
            res = fetch_page(&self.client, &item.url) => res,
        };
        let fetched = fetched.with_context(|| format!("failed to fetch page {}", item.url))?;

        let page = match fetched {
            Fetched::Html { url, body } => {
                // Redirected somewhere we should not walk, or already walked
                let redirected_away = url != item.url
                    && (!(self.in_scope)(&url) || !self.visited.insert(url.to_string()));
                if redirected_away {
                    debug!(from = %item.url, to = %url, "not following redirected page");
                    Page {
                        url: item.url.to_string(),
                        ..Page::default()
                    }
                } else {
                    extract_references(&body, &url)
                }
            }
            Fetched::Status(status) if item.depth == 1 => {
                return Err(anyhow!(
                    "failed to fetch start page {}: responded with {}",
                    item.url,
                    status
                ));
            }
            // Not HTML, or broken: still a page, just without references
            Fetched::Status(_) | Fetched::Other => Page {
                url: item.url.to_string(),
                ..Page::default()
            },
        };
        info!(
            url = %page.url,
            links = page.links.len(),
            assets = page.assets.len(),
            "crawled page"
        );

        self.enqueue_links(&page, item.depth);
        Ok(Some(page))
    }

    fn enqueue_links(&mut self, page: &Page, depth: usize) {
        if self.max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        for link in &page.links {
            let Ok(url) = Url::parse(link) else {
                continue;
            };
            if !(self.in_scope)(&url) {
                continue;
            }
            // Mark as visited when queued so a page is never queued twice
            if self.visited.insert(url.to_string()) {
                self.queue.push_back(CrawlItem {
                    url,
                    depth: depth + 1,
                });
            }
        }
    }
}

// What a page fetch came back with
enum Fetched {
    /// 200 with an HTML body; `url` is where redirects ended up
    Html { url: Url, body: String },
    /// 200, but not HTML
    Other,
    /// Anything but 200 after redirects
    Status(StatusCode),
}

// Fetches a page
//
// Transport and body errors are returned as errors; every HTTP answer is a
// Fetched value.
async fn fetch_page(client: &Client, url: &Url) -> Result<Fetched> {
    debug!(%url, "GET page");
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    debug!(%url, final_url = %response.url(), status = %status, "page response");
    if status != StatusCode::OK {
        return Ok(Fetched::Status(status));
    }

    // A missing content type is given the benefit of the doubt
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(true, |ct| ct.contains("html"));
    if !is_html {
        return Ok(Fetched::Other);
    }

    let final_url = response.url().clone();
    let body = response.text().await?;
    Ok(Fetched::Html {
        url: final_url,
        body,
    })
}

// Extracts the links and assets of one HTML page
//
// Both lists are absolute http(s) URLs without fragment, in document order.
// Duplicates are kept: each occurrence is a separate reference.
pub fn extract_references(html: &str, page_url: &Url) -> Page {
    let document = Html::parse_document(html);

    // Constant selectors, known to be valid
    let link_selector = Selector::parse("a[href]").unwrap();
    let asset_selector =
        Selector::parse("img[src], script[src], link[href], source[src], iframe[src]").unwrap();

    let links = document
        .select(&link_selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_link(page_url, href))
        .collect();

    let assets = document
        .select(&asset_selector)
        .filter_map(|el| {
            let attr = if el.value().name() == "link" { "href" } else { "src" };
            el.value().attr(attr)
        })
        .filter_map(|src| resolve_link(page_url, src))
        .collect();

    Page {
        url: page_url.to_string(),
        links,
        assets,
    }
}

// Resolves a link (possibly relative) to an absolute http(s) URL
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a pull-based next_page() instead of a callback?
//    - The caller owns the loop: `while let Some(page) = crawler.next_page()`
//    - Stopping the crawl is just `break`, no special return value needed
//
// 2. What is `(self.in_scope)(&url)`?
//    - in_scope is a field holding a closure
//    - The parentheses make Rust call the field instead of looking for a
//      method named in_scope
//
// 3. Why are assets never queued?
//    - Images and scripts are not pages, they are only checked for
//      reachability by the driver
// -----------------------------------------------------------------------------
