//! HTTP server setup and request orchestration.
//!
//! # Responsibilities
//! - Build the Axum router: one pair of routes per proxy prefix, the
//!   wisp stub, landing page, health check, and the catch-all fallback
//! - Wire middleware (request ID, timeout, tracing)
//! - Drive the per-request pipeline: resolve → fetch → transform →
//!   assemble
//!
//! # Route surface
//! ```text
//! ANY {prefix}?url=…|u=…      explicit target via query parameter
//! ANY {prefix}/{*target}      explicit target via encoded path segment
//! ANY /wisp[/…]               fixed 501 stub
//! ANY /* (fallback)           implicit target via Referer chain
//! GET /                       landing page (redirect target)
//! GET /health                 liveness probe
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::REFERER;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use url::form_urlencoded;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::RequestIdLayer;
use crate::http::response::preflight_response;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::proxy::{resolver, ProxyEngine};

/// Headroom added to the outer request timeout so the upstream timeout
/// fires first and surfaces as a proxy error rather than a blank 408.
const TIMEOUT_HEADROOM_SECS: u64 = 5;

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>rewrite-proxy</title></head>
<body>
  <h1>rewrite-proxy</h1>
  <form action="/light" method="get">
    <input type="text" name="url" placeholder="https://example.com" size="50">
    <button type="submit">Go</button>
  </form>
</body>
</html>
"#;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub config: Arc<ProxyConfig>,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let engine = Arc::new(ProxyEngine::new(&config)?);
        let state = AppState {
            engine,
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all routes and middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(landing_page))
            .route("/health", get(health))
            .route("/wisp", any(wisp_stub))
            .route("/wisp/{*rest}", any(wisp_stub));

        for prefix in &config.engine.prefixes {
            router = router
                .route(prefix, any(prefix_root_handler))
                .route(&format!("{}/{{*target}}", prefix), any(encoded_target_handler));
        }

        router
            .fallback(catch_all_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs + TIMEOUT_HEADROOM_SECS,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefixes = ?self.config.engine.prefixes,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "rewrite-proxy" }))
}

/// The websocket facade is not implemented; it always answers 501 so
/// clients probing for it fail fast instead of hanging on an upgrade.
async fn wisp_stub() -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({ "error": "WebSocket support coming soon", "service": "wisp" })),
    )
        .into_response()
}

/// `ANY {prefix}` — explicit target via `url`/`u` query parameter.
async fn prefix_root_handler(State(state): State<AppState>, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    let prefix = req.uri().path().to_string();
    let target_param = req.uri().query().and_then(|q| {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect();
        pairs
            .iter()
            .find(|(k, _)| k == "url")
            .or_else(|| pairs.iter().find(|(k, _)| k == "u"))
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    });

    match target_param {
        None => Redirect::temporary("/").into_response(),
        Some(raw) => match resolver::resolve_explicit(&raw) {
            Ok(target) => relay(&state, &prefix, target, req).await,
            Err(err) => err.into_response(),
        },
    }
}

/// `ANY {prefix}/{*target}` — explicit target via encoded path segment,
/// with referer-based resolution for relative paths that kept the
/// prefix.
async fn encoded_target_handler(State(state): State<AppState>, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    let path = req.uri().path().to_string();
    let Some((prefix, remainder)) = split_prefix(&path, &state.config.engine.prefixes) else {
        // Routing guarantees a prefix matched; treat anything else as
        // unresolvable rather than panicking.
        return unresolvable(req.method(), &path).into_response();
    };

    if remainder.is_empty() {
        return Redirect::temporary("/").into_response();
    }

    let raw = match req.uri().query() {
        Some(query) => format!("{}?{}", remainder, query),
        None => remainder,
    };
    let decoded = resolver::decode_loose(&raw);

    if resolver::looks_absolute(&decoded) {
        return match resolver::resolve_explicit(&raw) {
            Ok(target) => relay(&state, &prefix, target, req).await,
            Err(err) => err.into_response(),
        };
    }

    // A relative path that escaped through a proxied page link; rebuild
    // it from the referer chain, staying on this route's prefix.
    let recovered = referer_base(&state, &req).and_then(|(_, base)| resolver::resolve_relative(&base, &decoded));
    if let Some(target) = recovered {
        return relay(&state, &prefix, target, req).await;
    }

    match fallback_target(&state, &decoded) {
        Some(Ok(target)) => relay(&state, &prefix, target, req).await,
        Some(Err(err)) => err.into_response(),
        None => unresolvable(req.method(), &path).into_response(),
    }
}

/// Catch-all for paths under no known route: relative references from
/// proxied pages land here and are resolved through the referer chain.
async fn catch_all_handler(State(state): State<AppState>, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    let path = req.uri().path().to_string();

    // Static asset surface is outside the engine; a miss there is an
    // ordinary 404, never an implicit proxy target.
    if path.starts_with("/ui/") || path.starts_with("/assets/") {
        return static_not_found(req.method(), &path);
    }

    // Bare "{prefix}/" carries no target.
    if state
        .config
        .engine
        .prefixes
        .iter()
        .any(|p| path == format!("{}/", p))
    {
        return Redirect::temporary("/").into_response();
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let recovered = referer_base(&state, &req);
    if let Some((prefix, base)) = recovered {
        if let Some(target) = resolver::resolve_relative(&base, &path_and_query) {
            return relay(&state, &prefix, target, req).await;
        }
    }

    match fallback_target(&state, &path_and_query) {
        Some(Ok(target)) => {
            let prefix = state.config.engine.prefixes[0].clone();
            relay(&state, &prefix, target, req).await
        }
        Some(Err(err)) => err.into_response(),
        None => unresolvable(req.method(), &path_and_query).into_response(),
    }
}

/// Run the engine for a resolved target, recording the outcome.
async fn relay(state: &AppState, prefix: &str, target: Url, req: Request) -> Response {
    let start = Instant::now();
    let method = req.method().clone();

    let response = match buffer_and_handle(state, prefix, target, req).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(prefix, error = %err, "Relay failed");
            err.into_response()
        }
    };

    metrics::record_request(prefix, method.as_str(), response.status().as_u16(), start);
    response
}

async fn buffer_and_handle(
    state: &AppState,
    prefix: &str,
    target: Url,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();
    let body_bytes = if matches!(parts.method.as_str(), "GET" | "HEAD" | "OPTIONS") {
        None
    } else {
        Some(
            to_bytes(body, state.config.listener.max_body_bytes)
                .await
                .map_err(|e| ProxyError::PayloadTooLarge(e.to_string()))?,
        )
    };

    state
        .engine
        .handle(prefix, target, parts.method, parts.headers, body_bytes)
        .await
}

/// Split `/light/rest` into `("/light", "rest")` against the configured
/// prefix set. The remainder stays percent-encoded.
fn split_prefix(path: &str, prefixes: &[String]) -> Option<(String, String)> {
    for prefix in prefixes {
        if let Some(rest) = path.strip_prefix(&format!("{}/", prefix)) {
            return Some((prefix.clone(), rest.to_string()));
        }
    }
    None
}

fn referer_base(state: &AppState, req: &Request) -> Option<(String, Url)> {
    req.headers()
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| resolver::base_from_referer(referer, &state.config.engine.prefixes))
}

fn fallback_target(state: &AppState, path: &str) -> Option<Result<Url, ProxyError>> {
    state
        .config
        .engine
        .fallback_host
        .as_ref()
        .map(|host| resolver::fallback_candidate(host, path))
}

fn unresolvable(method: &Method, path: &str) -> ProxyError {
    ProxyError::Unresolvable(format!("Route {}:{} not found", method, path))
}

fn static_not_found(method: &Method, path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {}:{} not found", method, path),
            "hint": "Make sure you accessed this through the proxy interface",
        })),
    )
        .into_response()
}
