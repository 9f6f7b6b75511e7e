// src/error.rs
// =============================================================================
// Why a single link check can fail.
//
// A failed check is not a fatal error: it gets cached once and then copied
// into every failure record that points at the same URL. That is why
// CheckError is Clone and why the reqwest error sits behind an Arc.
//
// Fatal errors (bad start path, root page unreachable, server bind failure)
// stay as anyhow::Error in main.rs.
// =============================================================================

use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CheckError {
    /// The server answered, but not with 200 OK (redirects included)
    #[error("responded with {0}")]
    Status(StatusCode),

    /// No response headers before the check deadline
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The run was interrupted before or during the check
    #[error("check cancelled")]
    Cancelled,

    /// DNS, connection refused, TLS, malformed URL...
    #[error("{0}")]
    Request(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        CheckError::Request(Arc::new(e))
    }
}

/// Result of verifying one target URL: Ok(()) means it answered 200.
pub type CheckOutcome = std::result::Result<(), CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_carries_status_line() {
        let err = CheckError::Status(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "responded with 404 Not Found");
    }

    #[test]
    fn test_redirect_is_reported_with_its_status() {
        let err = CheckError::Status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(err.to_string(), "responded with 301 Moved Permanently");
    }

    #[test]
    fn test_timeout_message() {
        let err = CheckError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out after 5s");
    }
}
