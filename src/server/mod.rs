//! Preview server with optional live reload over Server-Sent Events

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::helpers::{normalize_segments, strip_base_path, with_base_path, NOT_FOUND_PATH};
use crate::Site;

/// Live reload endpoint, served both at the root and under the base path
pub const LIVE_RELOAD_PATH: &str = "/__live-reload";

/// Attribute marking an already injected live reload script
pub const LIVE_RELOAD_MARKER: &str = "data-preview-live-reload";

const RETRY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy)]
pub(crate) enum Signal {
    /// Reload with a Unix-millis timestamp
    Reload(i64),
    /// End every open stream
    Close,
}

/// Handle for pushing reload events to connected browsers
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<Signal>,
}

impl LiveReload {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Ask every connected page to reload
    pub fn trigger(&self) {
        let stamp = chrono::Utc::now().timestamp_millis();
        // No receivers just means no open pages
        let _ = self.tx.send(Signal::Reload(stamp));
    }

    /// End every open live reload stream
    pub fn close_clients(&self) {
        let _ = self.tx.send(Signal::Close);
    }

    /// Number of connected live reload streams
    pub fn clients(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

/// Server state
struct ServerState {
    output_dir: PathBuf,
    base_path: String,
    live_reload: Option<LiveReload>,
}

/// Serves the output directory under the base path
pub struct PreviewServer {
    state: Arc<ServerState>,
    live_reload: LiveReload,
}

impl PreviewServer {
    pub fn new(site: &Site, live_reload: bool) -> Self {
        Self::with_options(
            &site.output_dir,
            &site.config.normalized_base_path(),
            live_reload,
        )
    }

    /// `base_path` must already be normalized
    pub fn with_options(output_dir: impl Into<PathBuf>, base_path: &str, live_reload: bool) -> Self {
        let handle = LiveReload::new();
        let state = Arc::new(ServerState {
            output_dir: output_dir.into(),
            base_path: base_path.to_string(),
            live_reload: live_reload.then(|| handle.clone()),
        });
        Self {
            state,
            live_reload: handle,
        }
    }

    pub fn live_reload(&self) -> LiveReload {
        self.live_reload.clone()
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new().route(LIVE_RELOAD_PATH, get(live_reload_handler));
        if !self.state.base_path.is_empty() {
            let scoped = with_base_path(&self.state.base_path, LIVE_RELOAD_PATH);
            router = router.route(&scoped, get(live_reload_handler));
        }

        router
            .fallback(fallback_handler)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` resolves
    ///
    /// Live reload streams are closed first so graceful shutdown can drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let live_reload = self.live_reload.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                live_reload.close_clients();
            })
            .await
            .context("Preview server failed")
    }
}

/// Bind the preview address, reporting a port clash in plain words
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    match TcpListener::bind((host, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => anyhow::bail!(
            "{}:{} is already in use. Set PREVIEW_PORT to another port.",
            host,
            port
        ),
        Err(e) => Err(e).with_context(|| format!("Failed to bind {}:{}", host, port)),
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down preview server...");
}

/// Serve the built site without live reload until Ctrl-C
pub async fn start(site: &Site, live_reload: bool) -> Result<()> {
    let host = site.config.preview.host.clone();
    let port = site.config.preview.port;

    let listener = bind(&host, port).await?;
    let base = site.config.normalized_base_path();
    tracing::info!(
        "Preview server running: http://{}:{}{}",
        host,
        port,
        if base.is_empty() { "/" } else { base.as_str() }
    );

    PreviewServer::new(site, live_reload)
        .serve(listener, shutdown_signal())
        .await
}

/// SSE handler for live reload
async fn live_reload_handler(State(state): State<Arc<ServerState>>) -> Response {
    match &state.live_reload {
        Some(live_reload) => {
            tracing::debug!("Live reload client connected");
            Sse::new(reload_events(live_reload.subscribe()))
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// `retry` first, then one `reload` event per trigger until closed
fn reload_events(
    rx: broadcast::Receiver<Signal>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let retry = tokio_stream::once(Ok(Event::default().retry(RETRY)));
    let reloads = BroadcastStream::new(rx)
        .take_while(|signal| !matches!(signal, Ok(Signal::Close)))
        .filter_map(|signal| match signal {
            Ok(Signal::Reload(stamp)) => {
                Some(Ok(Event::default().event("reload").data(stamp.to_string())))
            }
            // Lagged receivers only miss duplicate reloads
            _ => None,
        });
    retry.chain(reloads)
}

/// Fallback handler that maps request paths to files in the output directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(rest) = strip_base_path(&state.base_path, &path) else {
        let location = if state.base_path.is_empty() {
            "/"
        } else {
            state.base_path.as_str()
        };
        return (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response();
    };

    if let Some(file) = resolve_file(&state.output_dir, &rest).await {
        if is_html(&file) {
            return send_html(&state, &file, StatusCode::OK).await;
        }

        return match ServeFile::new(&file).try_call(request).await {
            Ok(response) => response.into_response(),
            Err(e) => {
                tracing::error!("Failed to serve {:?}: {}", file, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        };
    }

    let not_found = state.output_dir.join(NOT_FOUND_PATH.trim_start_matches('/'));
    if is_file(&not_found).await {
        return send_html(&state, &not_found, StatusCode::NOT_FOUND).await;
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// First regular file among `<p>`, `<p>/index.html`, `<p>.html`
async fn resolve_file(output_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let target = normalize_segments(request_path)
        .iter()
        .fold(output_dir.to_path_buf(), |path, segment| path.join(segment));

    let mut with_html = target.clone().into_os_string();
    with_html.push(".html");

    for candidate in [target.clone(), target.join("index.html"), PathBuf::from(with_html)] {
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html"))
        .unwrap_or(false)
}

async fn send_html(state: &ServerState, file: &Path, status: StatusCode) -> Response {
    match tokio::fs::read_to_string(file).await {
        Ok(content) => {
            let body = if state.live_reload.is_some() {
                inject_live_reload(&content, &state.base_path)
            } else {
                content
            };
            (status, Html(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to read {:?}: {}", file, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn live_reload_script(base_path: &str) -> String {
    format!(
        r#"<script {}>(function(){{const source=new EventSource("{}");source.addEventListener("reload",function(){{window.location.reload();}});}})();</script>"#,
        LIVE_RELOAD_MARKER,
        with_base_path(base_path, LIVE_RELOAD_PATH)
    )
}

/// Inject the live reload script before `</body>`, or append it
fn inject_live_reload(html: &str, base_path: &str) -> String {
    if html.contains(LIVE_RELOAD_MARKER) {
        return html.to_string();
    }

    let script = live_reload_script(base_path);
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], script, &html[pos..]),
        None => format!("{}{}", html, script),
    }
}
