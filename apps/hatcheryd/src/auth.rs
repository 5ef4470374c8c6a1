//! Shared-secret authentication for the HTTP transport.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Verifies `Authorization: Bearer <secret>` against one configured secret.
#[derive(Debug, Clone)]
pub struct SharedSecret {
    secret: Arc<str>,
}

impl SharedSecret {
    /// Create from a non-empty secret.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    /// Create from the server configuration, `None` when no secret is set.
    pub fn from_config(config: &crate::config::ServerConfig) -> Option<Self> {
        config.secret().map(Self::new)
    }

    /// Whether `token` matches the secret. Compares in constant time.
    pub fn verify(&self, token: &str) -> bool {
        let expected = self.secret.as_bytes();
        let given = token.as_bytes();
        if expected.len() != given.len() {
            return false;
        }
        expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Whether the request headers carry the secret as a bearer token.
    pub fn authorizes(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| self.verify(token.trim()))
    }
}

/// Middleware rejecting requests without the shared secret.
pub async fn require_secret(
    State(secret): State<SharedSecret>,
    request: Request,
    next: Next,
) -> Response {
    if secret.authorizes(request.headers()) {
        return next.run(request).await;
    }
    tracing::warn!("rejected unauthenticated request to {}", request.uri().path());
    (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response()
}
