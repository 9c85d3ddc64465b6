//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check prefix shape and collisions with reserved routes
//! - Validate value ranges (timeouts > 0, addresses parseable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// Routes the server claims for itself; a proxy prefix may not shadow them.
const RESERVED_ROUTES: &[&str] = &["/", "/health", "/wisp", "/ui", "/assets"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    NoPrefixes,
    InvalidPrefix(String),
    DuplicatePrefix(String),
    ReservedPrefix(String),
    InvalidFallbackHost(String),
    ZeroTimeout(&'static str),
    ZeroRetryAttempts,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid bind address '{}'", addr)
            }
            ValidationError::NoPrefixes => write!(f, "at least one proxy prefix is required"),
            ValidationError::InvalidPrefix(p) => write!(
                f,
                "prefix '{}' must start with '/', not end with '/', and contain a single segment",
                p
            ),
            ValidationError::DuplicatePrefix(p) => write!(f, "prefix '{}' is listed twice", p),
            ValidationError::ReservedPrefix(p) => {
                write!(f, "prefix '{}' collides with a reserved route", p)
            }
            ValidationError::InvalidFallbackHost(h) => {
                write!(f, "fallback host '{}' must be a bare host name", h)
            }
            ValidationError::ZeroTimeout(which) => write!(f, "{} timeout must be non-zero", which),
            ValidationError::ZeroRetryAttempts => {
                write!(f, "retry.max_attempts must be at least 1")
            }
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.engine.prefixes.is_empty() {
        errors.push(ValidationError::NoPrefixes);
    }

    let mut seen = HashSet::new();
    for prefix in &config.engine.prefixes {
        if !prefix.starts_with('/') || prefix.ends_with('/') || prefix[1..].contains('/') {
            errors.push(ValidationError::InvalidPrefix(prefix.clone()));
            continue;
        }
        if RESERVED_ROUTES.contains(&prefix.as_str()) {
            errors.push(ValidationError::ReservedPrefix(prefix.clone()));
        }
        if !seen.insert(prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(prefix.clone()));
        }
    }

    if let Some(host) = &config.engine.fallback_host {
        if host.is_empty() || host.contains('/') || host.contains(':') {
            errors.push(ValidationError::InvalidFallbackHost(host.clone()));
        }
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request"));
    }
    if config.upstream.retry.enabled && config.upstream.retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroRetryAttempts);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
