use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// These are the gateway functions: account creation and session opening, plus
/// the liveness probe. Everything else in the application sits behind at least
/// the authentication gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /sign_up
        // New account registration. Duplicate usernames come back as a
        // recoverable validation error, never a raw constraint violation.
        .route("/sign_up", post(handlers::sign_up))
        // POST /log_in
        // Credential verification and session creation. The failure message is
        // deliberately generic to avoid leaking which field was wrong.
        .route("/log_in", post(handlers::log_in))
}
