//! Plain-text operational counters.

use crate::auth::extract::AppState;
use crate::error::AppError;
use crate::models::{unix_now, MetricsSnapshot};
use axum::extract::State;

/// GET /metrics — Session and allow-list counters, one `key: value`
/// line each. Counting walks the session keyspace with SCAN, so the
/// numbers are a snapshot, not a transaction.
pub async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    let mut con = state.connection().await?;
    let now = unix_now();

    let (active, authenticated, expired) =
        crate::storage::session::query_metrics(&mut con, now).await?;

    let snapshot = MetricsSnapshot {
        active_sessions: active,
        authenticated_sessions: authenticated,
        expired_sessions: expired,
        authorized_addresses: state.allowlist.len() as u64,
    };

    Ok(snapshot.render())
}
