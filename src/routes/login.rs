//! Login protocol handlers: challenge issuance, proof submission, logout.

use crate::auth::challenge::{canonical_address, parse_challenge, signature_is_valid, signed_host};
use crate::auth::extract::{check_rate_limit, AppState, SessionCookie, SESSION_COOKIE};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    unix_now, ChallengeResponse, LoginQuery, ProofRequest, ProofResponse, SessionStatus,
};
use crate::storage;
use axum::{
    extract::{ConnectInfo, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    Host,
};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// Build the session cookie. HttpOnly and SameSite=Strict always; the
/// Domain and Secure attributes come from configuration.
fn session_cookie(config: &Config, id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, id);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_secure(config.cookie_secure);
    cookie.set_path("/");
    if let Some(domain) = &config.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Accept a continuation target only if it is a well-formed absolute
/// http(s) URL. Anything else (relative paths, javascript:, data:) is
/// dropped, never redirected to.
fn safe_continuation(raw: &str) -> Option<&str> {
    let parsed = url::Url::parse(raw).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(raw)
}

/// GET / — Login entry point.
///
/// Authenticated session: report status, or follow a valid `next`
/// continuation target. Pending session: re-render the same outstanding
/// nonce. Otherwise: mint a session, set the cookie, return the nonce.
pub async fn login_form(
    State(state): State<AppState>,
    Host(host): Host,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    SessionCookie(session_id): SessionCookie,
) -> Result<Response, AppError> {
    ensure_known_host(&state, &host)?;

    let mut con = state.connection().await?;
    let now = unix_now();

    if let Some(address) =
        storage::session::session_is_authenticated(&mut con, session_id.as_deref(), now).await?
    {
        let authorized = state.allowlist.is_authorized(&address);
        // Only an authorized visitor is sent onward; following the
        // continuation for a denied address would bounce them between
        // here and the proxy forever
        if authorized {
            if let Some(target) = query.next.as_deref().and_then(safe_continuation) {
                return Ok(Redirect::to(target).into_response());
            }
        }
        return Ok(Json(SessionStatus {
            authenticated: true,
            address,
            authorized,
        })
        .into_response());
    }

    // A valid-but-unauthenticated session keeps its outstanding nonce;
    // revisiting the login page must not mint a new challenge.
    if let Some(id) = session_id.as_deref() {
        if storage::session::session_is_valid(&mut con, Some(id), now).await? {
            if let Some(nonce) = storage::session::get_nonce(&mut con, id).await? {
                return Ok(Json(ChallengeResponse { nonce }).into_response());
            }
        }
    }

    let (new_id, nonce) =
        storage::session::create_session(&mut con, now, state.config.session_ttl_secs).await?;
    tracing::info!(action = "session_created", "issued new login challenge");

    let jar = jar.add(session_cookie(&state.config, new_id));
    Ok((jar, Json(ChallengeResponse { nonce })).into_response())
}

/// POST / — Proof submission.
///
/// Session checks run before any parsing or cryptography; a failed
/// signature leaves the session pending so the visitor can retry
/// against the same nonce.
pub async fn submit_proof(
    State(state): State<AppState>,
    Host(host): Host,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    SessionCookie(session_id): SessionCookie,
    Json(req): Json<ProofRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_known_host(&state, &host)?;

    let mut con = state.connection().await?;

    let rate_limit_key = format!("ratelimit:proof:{}", addr.ip());
    let allowed = check_rate_limit(
        &mut con,
        &rate_limit_key,
        state.config.rate_limit_proof_per_min,
        60,
    )
    .await?;
    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        addr.ip().hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = "proof", ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    let session_id = session_id
        .ok_or_else(|| AppError::Forbidden("no session cookie".to_string()))?;

    let now = unix_now();
    let session = storage::session::get_session(&mut con, &session_id)
        .await?
        .filter(|s| s.is_usable(now))
        .ok_or_else(|| AppError::Forbidden("session is not valid".to_string()))?;

    let message = parse_challenge(&req.message)?;

    let signed = signed_host(&message);
    if !state.config.accepts_host(signed) {
        return Err(AppError::DomainMismatch(format!(
            "signed domain '{}' is not an accepted hostname",
            message.domain
        )));
    }

    // The nonce in the signed challenge must be the one bound to this
    // session; a signature over any other nonce is a replay.
    if message.nonce != session.nonce {
        tracing::warn!(action = "nonce_mismatch", "challenge nonce does not match session");
        return Err(AppError::Forbidden(
            "challenge nonce does not match this session".to_string(),
        ));
    }

    if !signature_is_valid(&req.signature, &message) {
        tracing::warn!(action = "signature_rejected", "invalid signature for challenge");
        return Err(AppError::SignatureInvalid);
    }

    let address = canonical_address(&message);
    // The row can be purged between the validity check and the bind;
    // that is the same outcome as an invalid session, not an error
    if !storage::session::bind_address(&mut con, &session_id, &address).await? {
        return Err(AppError::Forbidden("session is not valid".to_string()));
    }
    let authorized = state.allowlist.is_authorized(&address);

    tracing::info!(action = "address_bound", address = %address, authorized, "signature verified");

    Ok(Json(ProofResponse { address, authorized }))
}

/// GET /logout — Invalidate the current session and return to the
/// login entry point. Safe to call without a session.
pub async fn logout(
    State(state): State<AppState>,
    Host(host): Host,
    SessionCookie(session_id): SessionCookie,
) -> Result<impl IntoResponse, AppError> {
    ensure_known_host(&state, &host)?;

    if let Some(id) = session_id {
        let mut con = state.connection().await?;
        storage::session::invalidate_session(&mut con, &id).await?;
        tracing::info!(action = "logout", "session invalidated");
    }

    Ok(Redirect::to("/"))
}

fn ensure_known_host(state: &AppState, host: &str) -> Result<(), AppError> {
    super::ensure_known_host(&state.config, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_accepts_http_and_https() {
        assert_eq!(
            safe_continuation("https://app.example/secret"),
            Some("https://app.example/secret")
        );
        assert_eq!(
            safe_continuation("http://app.example/"),
            Some("http://app.example/")
        );
    }

    #[test]
    fn test_continuation_rejects_other_schemes() {
        assert_eq!(safe_continuation("javascript:alert(1)"), None);
        assert_eq!(safe_continuation("data:text/html,hi"), None);
        assert_eq!(safe_continuation("ftp://files.example/"), None);
    }

    #[test]
    fn test_continuation_rejects_relative_and_garbage() {
        assert_eq!(safe_continuation("/dashboard"), None);
        assert_eq!(safe_continuation("not a url"), None);
        assert_eq!(safe_continuation(""), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = crate::config::Config {
            hostnames: vec!["auth.example".to_string()],
            redis_url: "redis://127.0.0.1:6379".to_string(),
            allowlist_file: std::path::PathBuf::from("authorized.txt"),
            cookie_domain: Some("auth.example".to_string()),
            cookie_secure: true,
            session_ttl_secs: 3600,
            rate_limit_proof_per_min: 30,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
        };

        let cookie = session_cookie(&config, "abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.domain(), Some("auth.example"));
        assert_eq!(cookie.path(), Some("/"));
    }
}
