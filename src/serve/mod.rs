//! Preview server with live reload.
//!
//! Serves the built output tree and exposes a server-sent-events stream that
//! connected browsers subscribe to. Reload notifications are ordinary tasks
//! ([`ReloadTask`]), so sequencing a notification strictly after a rebuild is
//! plain plan composition: `sequence(styles, reload:styles)`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::core::task::{Task, TaskError};

/// Script served at `/__atelier/client.js`; pages include it during
/// development to subscribe to the change stream.
const CLIENT_SCRIPT: &str = r#"(() => {
  const source = new EventSource('/__atelier/events');
  source.addEventListener('change', (event) => {
    if (event.data === 'styles') {
      for (const link of document.querySelectorAll('link[rel="stylesheet"]')) {
        const url = new URL(link.href);
        url.searchParams.set('v', Date.now().toString());
        link.href = url.toString();
      }
    } else {
      location.reload();
    }
  });
})();
"#;

/// Errors that can occur while serving the preview.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Could not bind or serve on the configured address.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured host/port did not parse into a socket address.
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Configuration for the preview server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerOptions {
    /// Create options with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServeError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServeError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

/// What connected browsers should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the whole page.
    Full,
    /// Re-fetch stylesheets without a navigation.
    Styles,
}

impl ReloadKind {
    /// Wire form sent on the event stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadKind::Full => "reload",
            ReloadKind::Styles => "styles",
        }
    }
}

/// Handle for pushing reload notifications to connected browsers.
#[derive(Clone)]
pub struct ReloadHandle {
    tx: broadcast::Sender<ReloadKind>,
}

impl ReloadHandle {
    /// Create a handle with no subscribers yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Notify all connected browsers. Returns how many subscribers were
    /// reached; notifying with none connected is a no-op.
    pub fn notify(&self, kind: ReloadKind) -> usize {
        self.tx.send(kind).unwrap_or(0)
    }

    /// Subscribe to the notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A leaf task that pushes a reload notification.
///
/// Append it to a watch plan so the notification is sequenced after the
/// rebuild completes.
pub struct ReloadTask {
    name: String,
    reload: ReloadHandle,
    kind: ReloadKind,
}

impl ReloadTask {
    /// Full page reload, named `reload`.
    pub fn full(reload: &ReloadHandle) -> Self {
        Self {
            name: "reload".to_string(),
            reload: reload.clone(),
            kind: ReloadKind::Full,
        }
    }

    /// Stylesheet refresh, named `reload:styles`.
    pub fn styles(reload: &ReloadHandle) -> Self {
        Self {
            name: "reload:styles".to_string(),
            reload: reload.clone(),
            kind: ReloadKind::Styles,
        }
    }
}

#[async_trait]
impl Task for ReloadTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        let reached = self.reload.notify(self.kind);
        debug!(kind = self.kind.as_str(), subscribers = reached, "reload notified");
        Ok(())
    }
}

/// Static preview server over the built output tree.
pub struct PreviewServer {
    options: ServerOptions,
    root: PathBuf,
    reload: ReloadHandle,
}

impl PreviewServer {
    /// Create a server for the given output directory.
    pub fn new(options: ServerOptions, root: impl Into<PathBuf>) -> Self {
        Self {
            options,
            root: root.into(),
            reload: ReloadHandle::new(),
        }
    }

    /// The reload handle browsers connected to this server listen on.
    pub fn reload_handle(&self) -> ReloadHandle {
        self.reload.clone()
    }

    /// Build the router: the change stream, the client script, and static
    /// files from the output tree.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/__atelier/events", get(change_stream))
            .route("/__atelier/client.js", get(client_script))
            .fallback_service(ServeDir::new(&self.root))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.reload.clone())
    }

    /// Bind and serve until the process exits.
    pub async fn serve(self) -> Result<(), ServeError> {
        let addr = self.options.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %addr,
            root = %self.root.display(),
            "preview server listening"
        );
        let router = self.router();
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// SSE endpoint browsers subscribe to for change notifications.
async fn change_stream(
    State(reload): State<ReloadHandle>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = reload.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(kind) => {
                    let event = SseEvent::default().event("change").data(kind.as_str());
                    return Some((Ok(event), rx));
                }
                // Skipped notifications collapse into the next one.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        CLIENT_SCRIPT,
    )
}
