// src/checker/http.rs
// =============================================================================
// This module checks if a single URL is alive by making one HTTP GET.
//
// Rules:
// - Only a 200 OK counts as reachable. Redirects are NOT followed, a 301
//   is reported like a 404.
// - Every check is bounded by a 5 second deadline
// - The run-wide CancellationToken aborts the request as soon as it fires,
//   and a check started after cancellation never touches the network
// - No retries: one attempt is the answer for this run
//
// Rust concepts:
// - tokio::select!: Race several futures, the first to finish wins
// - tokio::time::timeout: Wrap a future with a deadline
// - Drop: The response (and its unread body) is released when it goes out
//   of scope, on every exit path
// =============================================================================

use crate::error::{CheckError, CheckOutcome};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deadline for one reachability check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-level backstop; the check deadline above always fires first.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

// Builds the HTTP client used for every link check
//
// We reuse this client for all checks (connection pooling).
// Redirects are disabled: the checker wants to see the 3xx.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("linkwalk/", env!("CARGO_PKG_VERSION")))
        .timeout(CLIENT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

// Performs reachability checks for absolute URLs
//
// Cheap to clone: reqwest::Client is a reference-counted handle.
#[derive(Debug, Clone)]
pub struct UrlChecker {
    client: Client,
    timeout: Duration,
}

impl UrlChecker {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: CHECK_TIMEOUT,
        }
    }

    /// Overrides the check deadline. Tests use this to avoid 5s sleeps.
    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // Checks one URL
    //
    // Parameters:
    //   url: absolute http(s) URL
    //   cancel: the run's cancellation token
    //
    // Returns: Ok(()) for 200, otherwise the reason it is broken
    pub async fn check(&self, url: &str, cancel: &CancellationToken) -> CheckOutcome {
        if cancel.is_cancelled() {
            return Err(CheckError::Cancelled);
        }

        let started = Instant::now();
        debug!(url, "GET");

        // Whichever fires first wins: cancellation, the deadline, or the response.
        // Losing branches are dropped, which aborts the in-flight request.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url, "cancelled");
                return Err(CheckError::Cancelled);
            }
            res = tokio::time::timeout(self.timeout, self.client.get(url).send()) => match res {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    debug!(url, error = %e, "request failed");
                    return Err(e.into());
                }
                Err(_) => {
                    debug!(url, "timed out");
                    return Err(CheckError::Timeout(self.timeout));
                }
            },
        };

        let status = response.status();
        debug!(
            url,
            status = %status,
            elapsed_ms = (started.elapsed().as_millis() as u64),
            "response"
        );
        // We never read the body; dropping the response releases the connection.
        drop(response);

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(CheckError::Status(status))
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why GET and not HEAD?
//    - Plenty of servers answer HEAD differently from GET (405, 404...)
//    - GET is what a browser does, so it is what we measure
//    - We only wait for the headers, the body is never downloaded
//
// 2. What does `biased;` do in select!?
//    - Normally select! polls branches in random order
//    - biased polls them top to bottom, so cancellation always wins a tie
//
// 3. Why return early on is_cancelled()?
//    - After Ctrl-C every remaining check of the page resolves immediately
//      without opening a single socket
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn checker() -> UrlChecker {
        UrlChecker::new(build_client().unwrap())
    }

    #[tokio::test]
    async fn test_ok_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/a", server.uri());
        let outcome = checker().check(&url, &CancellationToken::new()).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_not_found_carries_status_line() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/img.png", server.uri());
        let err = checker()
            .check(&url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Status(StatusCode::NOT_FOUND)));
        assert_eq!(err.to_string(), "responded with 404 Not Found");
    }

    #[tokio::test]
    async fn test_redirect_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/old", server.uri());
        let err = checker()
            .check(&url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Status(StatusCode::MOVED_PERMANENTLY)));
    }

    #[tokio::test]
    async fn test_server_error_is_broken() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = checker()
            .check(&server.uri(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "responded with 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_slow_server_hits_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let started = Instant::now();
        let err = checker()
            .with_timeout(Duration::from_millis(200))
            .check(&server.uri(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cancelled_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = checker().check(&server.uri(), &cancel).await.unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = checker().check(&server.uri(), &cancel).await.unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_connection_refused_is_broken() {
        // Grab a free port, then close it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}/dead", addr);
        let err = checker()
            .check(&url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Request(_)));
    }
}
