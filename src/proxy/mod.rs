//! Proxy engine subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved target (resolver.rs)
//!     → upstream.rs (policy-filtered fetch, redirects, timeout/retry)
//!     → rewrite (content-type dispatched transform)
//!     → http::response (header filtering, CORS, body write)
//! ```
//!
//! One engine instance serves every configured prefix; the prefix a
//! request arrived under is passed per call and decides how emitted
//! references route back.

pub mod headers;
pub mod resolver;
pub mod upstream;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::error::ProxyError;
use crate::http::response::assemble;
use crate::rewrite::{self, ContentKind, RewriteContext};
use upstream::UpstreamClient;

pub struct ProxyEngine {
    client: UpstreamClient,
}

impl ProxyEngine {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: UpstreamClient::new(&config.upstream)?,
        })
    }

    /// Relay one request: fetch the target, transform the body according
    /// to its content type, and assemble the client response.
    pub async fn handle(
        &self,
        prefix: &str,
        target: Url,
        method: Method,
        inbound_headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, ProxyError> {
        tracing::debug!(prefix, target = %target, method = %method, "Relaying request");

        let response = self
            .client
            .fetch(&target, &method, &inbound_headers, body)
            .await?;

        let status = response.status();
        let upstream_headers = response.headers().clone();
        let content_type = upstream_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        let kind = ContentKind::classify(&content_type);
        // HEAD responses have no body to transform.
        let transformable = kind != ContentKind::Other && method.as_str() != "HEAD";

        let body = if transformable {
            let ctx = RewriteContext::new(prefix, target);
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ProxyError::Upstream(e.to_string()))?;
            let text = String::from_utf8_lossy(&bytes);
            Body::from(rewrite::transform_text(kind, &text, &ctx))
        } else {
            Body::from_stream(response.bytes_stream())
        };

        Ok(assemble(status, &upstream_headers, &content_type, body))
    }
}
