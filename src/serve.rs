// src/serve.rs
// =============================================================================
// Serves a local directory over HTTP so it can be checked like a live site.
//
// - Binds 127.0.0.1 on a port the OS picks
// - Static file semantics from tower-http's ServeDir (index.html for
//   directories, 404 for anything missing)
// - Shuts down gracefully when shutdown() is called or the LocalServer is
//   dropped, whichever happens first
// =============================================================================

use anyhow::{bail, Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::services::ServeDir;
use tracing::{debug, warn};

pub struct LocalServer {
    addr: SocketAddr,
    // Cancels the server's shutdown token when dropped
    guard: DropGuard,
    handle: JoinHandle<()>,
}

impl LocalServer {
    /// Base URL of the served directory, always ending in '/'.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn shutdown(self) {
        drop(self.guard);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "local server task failed");
        }
    }
}

// Starts serving `dir`
//
// Fails before binding anything if the directory does not exist.
pub async fn serve_dir(dir: &Path) -> Result<LocalServer> {
    let meta = tokio::fs::metadata(dir)
        .await
        .with_context(|| format!("cannot open {}", dir.display()))?;
    if !meta.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let app = Router::new().fallback_service(ServeDir::new(dir));

    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .context("failed to bind local server")?;
    let addr = listener.local_addr()?;
    debug!(%addr, dir = %dir.display(), "serving directory");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await });
        if let Err(e) = server.await {
            warn!(error = %e, "local server stopped with an error");
        }
    });

    Ok(LocalServer {
        addr,
        guard: shutdown.drop_guard(),
        handle,
    })
}
