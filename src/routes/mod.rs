//! HTTP route handlers.

pub mod forward;
pub mod login;
pub mod metrics;

use crate::auth::extract::AppState;
use crate::config::Config;
use crate::error::AppError;
use axum::{routing::get, Router};

/// Reject requests that arrived on a hostname this gateway is not
/// configured for. Called first in every browser-facing handler, before
/// any session logic runs.
pub fn ensure_known_host(config: &Config, host: &str) -> Result<(), AppError> {
    if config.accepts_host(host) {
        Ok(())
    } else {
        Err(AppError::HostRejected(format!(
            "unexpected hostname: {}",
            host
        )))
    }
}

/// Build the router with all endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        // Login entry point: challenge on GET, proof submission on POST
        .route("/", get(login::login_form).post(login::submit_proof))
        .route("/logout", get(login::logout))
        // Delegated verification for the upstream proxy
        .route("/auth", get(forward::forward_auth).post(forward::forward_auth))
        .route("/metrics", get(metrics::metrics))
}
