//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the redirect handler for every path and method
//! - Wire up middleware (request ID, tracing, timeout, in-flight tracking)
//! - Log every resolution with client address, path, destination and status
//! - Accept connections and serve HTTP/1.1 and HTTP/2 on each one
//! - Drain on the shutdown broadcast; abort whatever is left on termination
//!
//! # Design Decisions
//! - Connection tasks live in a `JoinSet` owned by the accept loop, so
//!   termination can abort them and wait until every socket is closed
//! - The request timeout also bounds how long a client may take to send its
//!   request head

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Uri},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinSet;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::request::{lookup_path, UuidRequestId, X_REQUEST_ID};
use crate::net::connection::{track_in_flight, InFlightTracker};
use crate::observability::metrics;
use crate::routing::{RedirectDecision, RedirectResolver};

/// Back-off after an accept error that is not specific to one connection,
/// such as running out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: RedirectResolver,
}

/// HTTP front end of the redirect service.
pub struct HttpServer {
    router: Router,
    in_flight: InFlightTracker,
    request_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server resolving through `resolver`.
    pub fn new(resolver: RedirectResolver, config: &ServerConfig) -> Self {
        let in_flight = InFlightTracker::new();
        let request_timeout = config.timeouts.request();
        let router = Self::build_router(AppState { resolver }, in_flight.clone(), request_timeout);
        Self {
            router,
            in_flight,
            request_timeout,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, in_flight: InFlightTracker, request_timeout: Duration) -> Router {
        Router::new()
            .fallback(redirect_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(in_flight, track_in_flight))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn in_flight(&self) -> InFlightTracker {
        self.in_flight.clone()
    }

    /// Serve connections until `shutdown` fires, then drain.
    ///
    /// Returns once every open connection has finished, or as soon as
    /// `terminate` fires, after aborting the connections still open. Bounding
    /// the drain is the caller's job.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
        mut terminate: oneshot::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let builder = Arc::new(self.connection_builder());
        let (draining_tx, draining_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        connections.spawn(serve_connection(
                            Arc::clone(&builder),
                            self.router.clone(),
                            stream,
                            remote,
                            draining_rx.clone(),
                        ));
                    }
                    Err(e) if is_connection_error(&e) => {
                        tracing::debug!(error = %e, "Connection failed during accept");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Connection task failed");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        drop(listener);
        draining_tx.send_replace(true);
        tracing::info!(connections = connections.len(), "Listener closed; draining in-flight requests");

        let mut terminate_open = true;
        loop {
            tokio::select! {
                joined = connections.join_next() => match joined {
                    Some(Err(e)) => tracing::error!(error = %e, "Connection task failed"),
                    Some(Ok(())) => {}
                    None => break,
                },
                signal = &mut terminate, if terminate_open => match signal {
                    Ok(()) => {
                        tracing::warn!(connections = connections.len(), "Aborting open connections");
                        connections.abort_all();
                        while connections.join_next().await.is_some() {}
                        break;
                    }
                    Err(_) => terminate_open = false,
                },
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn connection_builder(&self) -> auto::Builder<TokioExecutor> {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.request_timeout);
        builder
    }
}

/// Serve one connection until the client closes it, or until draining
/// starts and the request in progress (if any) has been answered.
async fn serve_connection(
    builder: Arc<auto::Builder<TokioExecutor>>,
    router: Router,
    stream: TcpStream,
    remote: SocketAddr,
    mut draining: watch::Receiver<bool>,
) {
    let service = service_fn(move |mut request: hyper::Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(request)
    });

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut shutting_down = *draining.borrow();
    if shutting_down {
        conn.as_mut().graceful_shutdown();
    }

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(client = %remote, error = %e, "Connection closed with error");
                }
                break;
            }
            _ = draining.changed(), if !shutting_down => {
                shutting_down = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}

/// Resolve the request path and answer with a redirect or a 404.
async fn redirect_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let path = lookup_path(uri.path());
    let decision = state.resolver.resolve(&path);
    let status = decision.status();

    match &decision {
        RedirectDecision::Found(dest) => {
            tracing::info!(
                request_id = %request_id,
                client = %client,
                method = %method,
                path = %path,
                destination = %dest,
                status = status.as_u16(),
                "Redirect"
            );
        }
        RedirectDecision::DefaultRedirect(dest) => {
            tracing::warn!(
                request_id = %request_id,
                client = %client,
                method = %method,
                path = %path,
                destination = %dest,
                status = status.as_u16(),
                "No match; redirecting to default"
            );
        }
        RedirectDecision::NotFound => {
            tracing::warn!(
                request_id = %request_id,
                client = %client,
                method = %method,
                path = %path,
                status = status.as_u16(),
                "No match and no default"
            );
        }
    }

    metrics::record_resolution(decision.outcome());
    decision.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Request, StatusCode};

    use crate::mapping::{MappingLoader, MappingStore};

    fn app(lines: &[&str], default: Option<&str>) -> Router {
        let store = MappingStore::new(MappingLoader::parse(lines.iter().copied()).snapshot);
        let server = HttpServer::new(RedirectResolver::new(store, default), &ServerConfig::default());
        server
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn redirects_mapped_path_case_insensitively() {
        let app = app(&["/foo http://example.com/foo", "/bar http://example.com/bar"], None);

        let response = send(app, Method::GET, "/FOO").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://example.com/foo");
    }

    #[tokio::test]
    async fn any_method_is_redirected() {
        let app = app(&["/form http://forms.test"], None);

        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let response = send(app.clone(), method, "/form").await;
            assert_eq!(response.status(), StatusCode::FOUND);
        }
    }

    #[tokio::test]
    async fn root_and_query_strings() {
        let app = app(&["/ http://root.test"], None);

        let response = send(app.clone(), Method::GET, "/").await;
        assert_eq!(response.headers()[header::LOCATION], "http://root.test");

        let response = send(app, Method::GET, "/?utm=1").await;
        assert_eq!(response.headers()[header::LOCATION], "http://root.test");
    }

    #[tokio::test]
    async fn miss_redirects_to_default() {
        let app = app(&["/a http://x.test"], Some("http://fallback.test"));

        let response = send(app, Method::GET, "/missing").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://fallback.test");
    }

    #[tokio::test]
    async fn miss_without_default_is_404() {
        let app = app(&["/a http://x.test"], None);

        let response = send(app, Method::GET, "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"not found\n");
    }

    #[tokio::test]
    async fn percent_encoded_paths_match() {
        let app = app(&["/café http://coffee.test"], None);

        let response = send(app, Method::GET, "/CAF%C3%A9").await;
        assert_eq!(response.headers()[header::LOCATION], "http://coffee.test");
    }

    #[tokio::test]
    async fn response_carries_request_id() {
        let app = app(&[], Some("http://fallback.test"));

        let response = send(app, Method::GET, "/x").await;
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
