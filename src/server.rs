//! HTTP server for the exporter.
//!
//! Serves the Prometheus scrape endpoint, a liveness endpoint and a small
//! landing page, over TCP or a Unix domain socket.

use std::future::{Future, IntoFuture};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
    serve::Listener,
};
use thiserror::Error;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::collector::{Collector, scrape};
use crate::config::ListenAddr;

/// Path of the scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

const INDEX_PAGE: &str = r#"<html>
<head><title>Gearman Exporter</title></head>
<body>
<h1>Gearman Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or serving failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<dyn Collector>,
}

impl AppState {
    pub fn new(collector: impl Collector) -> Self {
        Self {
            collector: Arc::new(collector),
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(healthz_handler))
        .route(METRICS_PATH, get(metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// A bound listener of either supported kind.
#[derive(Debug)]
pub enum BoundListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

/// Bind the listen address.
///
/// For a Unix socket, a file left at the path by a previous run is removed
/// first.
pub async fn bind(addr: &ListenAddr) -> Result<BoundListener, ServerError> {
    match addr {
        ListenAddr::Tcp(addr) => Ok(BoundListener::Tcp(TcpListener::bind(addr).await?)),
        ListenAddr::Unix(path) => bind_unix(path),
    }
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<BoundListener, ServerError> {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed stale socket file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(BoundListener::Unix(UnixListener::bind(path)?))
}

#[cfg(not(unix))]
fn bind_unix(_path: &Path) -> Result<BoundListener, ServerError> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "unix domain sockets are not supported on this platform",
    )
    .into())
}

impl BoundListener {
    /// Serve until `shutdown` resolves; see [`serve`].
    pub async fn serve(
        self,
        state: AppState,
        shutdown: impl Future<Output = ()> + Send + 'static,
        shutdown_timeout: Duration,
    ) -> Result<(), ServerError> {
        match self {
            Self::Tcp(listener) => serve(listener, state, shutdown, shutdown_timeout).await,
            #[cfg(unix)]
            Self::Unix(listener) => serve(listener, state, shutdown, shutdown_timeout).await,
        }
    }
}

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// Once `shutdown` fires, in-flight requests get `shutdown_timeout` to
/// finish. After that the server future is dropped and this returns `Ok`.
pub async fn serve<L>(
    listener: L,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
    shutdown_timeout: Duration,
) -> Result<(), ServerError>
where
    L: Listener,
    L::Addr: std::fmt::Debug,
{
    let (fired_tx, fired_rx) = tokio::sync::oneshot::channel::<()>();
    let signal = async move {
        shutdown.await;
        let _ = fired_tx.send(());
    };

    let server = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(ServerError::from),
        _ = fired_rx => {}
    }

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => result.map_err(ServerError::from),
        Err(_) => {
            tracing::warn!(
                timeout_ms = shutdown_timeout.as_millis(),
                "Graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    }
}

/// Landing page handler.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Liveness check. Does not contact gearman.
async fn healthz_handler() -> &'static str {
    "ok\n"
}

/// Scrape handler: polls gearman once per request.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match scrape(state.collector.as_ref()).await {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MetricDesc, MetricSink};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct StaticCollector;

    #[async_trait::async_trait]
    impl Collector for StaticCollector {
        fn describe(&self) -> Vec<MetricDesc> {
            vec![MetricDesc::new("gearman", "up", "is gearman up", &[])]
        }

        async fn collect(&self, sink: &mut (dyn MetricSink + Send)) {
            sink.emit(&self.describe()[0], 1.0, &[]);
        }
    }

    async fn get_body(uri: &str) -> (StatusCode, Option<String>, String) {
        let app = create_router(AppState::new(StaticCollector));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, content_type, body) = get_body("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
        assert!(body.contains("gearman_up 1"), "body: {body}");
    }

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let (status, _, body) = get_body("/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok\n");
    }

    #[tokio::test]
    async fn test_index_links_metrics() {
        let (status, content_type, body) = get_body("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains(r#"<a href="/metrics">"#));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _, _) = get_body("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scrape_over_unix_socket() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.sock");
        // Leftover from an earlier run.
        std::fs::write(&path, b"stale").unwrap();

        let listener = bind(&ListenAddr::Unix(path.clone())).await.unwrap();
        assert!(matches!(listener, BoundListener::Unix(_)));
        tokio::spawn(listener.serve(
            AppState::new(StaticCollector),
            std::future::pending::<()>(),
            Duration::from_secs(1),
        ));

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .expect("no response over unix socket")
            .unwrap();

        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200 OK"), "response: {response}");
        assert!(response.contains("gearman_up 1"), "response: {response}");
    }

    #[tokio::test]
    async fn test_bind_tcp() {
        let Ok(listener) = bind(&ListenAddr::Tcp("127.0.0.1:0".parse().unwrap())).await else {
            return;
        };
        assert!(matches!(listener, BoundListener::Tcp(_)));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(l) => l,
            Err(_) => return,
        };
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = async move {
            let _ = rx.await;
        };

        let handle = tokio::spawn(serve(
            listener,
            AppState::new(StaticCollector),
            shutdown,
            Duration::from_secs(1),
        ));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
