// src/report.rs
// =============================================================================
// The failure ledger and how it is printed.
//
// One FailureRecord is produced per (referencing page, broken URL) pair.
// A dead URL linked from three pages shows up three times, all with the
// same cause, because the cause comes from a single cached check.
//
// Records are kept in the order the driver discovered them, and printed in
// that order.
// =============================================================================

use crate::error::CheckError;
use serde::{Serialize, Serializer};
use std::fmt;

// How a page refers to a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// A navigable hyperlink (<a href>)
    Link,
    /// An embedded asset (image, script, stylesheet...)
    Resource,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Link => f.write_str("link"),
            Kind::Resource => f.write_str("resource"),
        }
    }
}

// One broken reference, ready for display
//
// `in_page` and `target` already have the start URL's prefix stripped.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    #[serde(rename = "in")]
    pub in_page: String,
    pub kind: Kind,
    pub target: String,
    #[serde(serialize_with = "serialize_display")]
    pub cause: CheckError,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in: {} {}: {} - {}",
            self.in_page, self.kind, self.target, self.cause
        )
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

// Strips the start URL from a URL for display
//
// The trailing slash of the start URL is kept on the remainder, so with a
// start of "http://x/" the root page shows as "/" and an image as "/img.png".
// URLs outside the start prefix are returned unchanged.
pub fn display_path(url: &str, start_url: &str) -> String {
    let prefix = start_url.trim_end_matches('/');
    match url.strip_prefix(prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') || rest.starts_with('?') => rest.to_string(),
        _ => url.to_string(),
    }
}

// Append-only, ordered collection of failures
#[derive(Debug, Default)]
pub struct FailureLedger {
    records: Vec<FailureRecord>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: FailureRecord) {
        self.records.push(record);
    }

    pub fn all(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Prints one line per failure to stderr, then the count
    //
    // Nothing is printed when the ledger is empty.
    pub fn print_text(&self) {
        if self.is_empty() {
            return;
        }
        for record in self.all() {
            eprintln!("{}", record);
        }
        eprintln!("{} broken", self.len());
    }

    // Prints the ledger as a JSON array on stdout
    pub fn print_json(&self) -> serde_json::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        println!("{}", serde_json::to_string_pretty(self.all())?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn record(in_page: &str, kind: Kind, target: &str) -> FailureRecord {
        FailureRecord {
            in_page: in_page.to_string(),
            kind,
            target: target.to_string(),
            cause: CheckError::Status(StatusCode::NOT_FOUND),
        }
    }

    #[test]
    fn test_record_line_format() {
        let r = record("/", Kind::Resource, "/img.png");
        assert_eq!(
            r.to_string(),
            "in: / resource: /img.png - responded with 404 Not Found"
        );
    }

    #[test]
    fn test_record_json_shape() {
        let r = record("/docs/", Kind::Link, "https://gone.example/");
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["in"], "/docs/");
        assert_eq!(value["kind"], "link");
        assert_eq!(value["target"], "https://gone.example/");
        assert_eq!(value["cause"], "responded with 404 Not Found");
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path("http://x/", "http://x/"), "/");
        assert_eq!(display_path("http://x/img.png", "http://x/"), "/img.png");
        assert_eq!(display_path("http://x/img.png", "http://x"), "/img.png");
        assert_eq!(
            display_path("https://other.example/a", "http://x/"),
            "https://other.example/a"
        );
        // Same host, different port: not under the start URL
        assert_eq!(
            display_path("http://127.0.0.1:40001/a", "http://127.0.0.1:4000/"),
            "http://127.0.0.1:40001/a"
        );
    }

    #[test]
    fn test_ledger_keeps_insertion_order_and_duplicates() {
        let mut ledger = FailureLedger::new();
        ledger.append(record("/", Kind::Link, "/dead"));
        ledger.append(record("/p2", Kind::Link, "/dead"));
        ledger.append(record("/p2", Kind::Resource, "/img.png"));

        let pages: Vec<_> = ledger.all().iter().map(|r| r.in_page.as_str()).collect();
        assert_eq!(pages, vec!["/", "/p2", "/p2"]);
        assert_eq!(ledger.len(), 3);
    }
}
