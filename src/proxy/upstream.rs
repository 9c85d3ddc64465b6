//! Upstream fetch client.
//!
//! # Responsibilities
//! - Issue the outbound request with policy-filtered headers and the
//!   original body
//! - Follow redirect chains transparently (the final response is what
//!   gets transformed)
//! - Enforce connect/request timeouts and the bounded retry policy
//!
//! # Design Decisions
//! - reqwest owns content negotiation: it requests gzip/deflate/brotli
//!   and hands back a decoded body, so Accept-Encoding from the client
//!   is dropped by policy rather than forwarded
//! - Environment proxy variables are ignored; this process *is* the
//!   egress path

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::schema::{RetryConfig, UpstreamConfig};
use crate::error::ProxyError;
use crate::proxy::headers::outbound_headers;
use crate::resilience::{calculate_backoff, is_retryable};

const MAX_REDIRECTS: usize = 10;

pub struct UpstreamClient {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build upstream client: {}", e)))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    /// Fetch the target, retrying transport failures of idempotent
    /// requests with jittered backoff.
    pub async fn fetch(
        &self,
        target: &Url,
        method: &Method,
        inbound: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, ProxyError> {
        let headers = outbound_headers(inbound);
        let max_attempts = if self.retry.enabled {
            self.retry.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut request = self
                .client
                .request(method.clone(), target.clone())
                .headers(headers.clone());
            if let Some(bytes) = &body {
                request = request.body(bytes.clone());
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt < max_attempts && is_retryable(method, &err) {
                        let delay =
                            calculate_backoff(attempt, self.retry.base_delay_ms, self.retry.max_delay_ms);
                        tracing::warn!(
                            target = %target,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Retrying upstream fetch"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ProxyError::Upstream(err.to_string()));
                }
            }
        }
    }
}
