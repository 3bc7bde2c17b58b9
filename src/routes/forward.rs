//! Delegated verification for the upstream reverse proxy.
//!
//! The proxy holds no session state; for every protected request it
//! asks this endpoint, forwarding the original request's metadata in
//! `X-Forwarded-Proto`, `X-Forwarded-Host`, and `X-Forwarded-Uri`.

use crate::auth::extract::{AppState, SessionCookie};
use crate::config::Config;
use crate::error::AppError;
use crate::models::unix_now;
use crate::storage;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// GET|POST /auth — Authorization decision for the proxy.
///
/// Authenticated session with an allow-listed address: plain 200, no
/// body required. Anything else: 302 to the login entry point, with the
/// original target embedded as `next` so the login flow can return the
/// visitor to their destination.
pub async fn forward_auth(
    State(state): State<AppState>,
    SessionCookie(session_id): SessionCookie,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut con = state.connection().await?;
    let now = unix_now();

    if let Some(address) =
        storage::session::session_is_authenticated(&mut con, session_id.as_deref(), now).await?
    {
        if state.allowlist.is_authorized(&address) {
            return Ok(StatusCode::OK.into_response());
        }
        tracing::warn!(action = "address_not_authorized", address = %address, "authenticated but not on the allow-list");
    }

    let location = login_redirect(&state.config, &headers);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Login entry point URL for an unauthorized visitor, carrying the
/// original target as `next` when the forwarded metadata describes one.
fn login_redirect(config: &Config, headers: &HeaderMap) -> String {
    let proto = forwarded_scheme(headers).unwrap_or("https");
    let login_host = config
        .hostnames
        .first()
        .map(String::as_str)
        .unwrap_or("localhost");

    let mut location = format!("{}://{}/", proto, login_host);
    if let Some(target) = forwarded_target(headers) {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("next", &target)
            .finish();
        location.push('?');
        location.push_str(&query);
    }
    location
}

/// Forwarded scheme, only if it is plain http or https. Any other
/// value is treated as absent so it can never smuggle a scheme into
/// the redirect.
fn forwarded_scheme(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "x-forwarded-proto").filter(|p| *p == "http" || *p == "https")
}

/// Reconstruct the original request URL from the forwarded metadata.
/// Requires a usable scheme and host; the URI defaults to `/`.
fn forwarded_target(headers: &HeaderMap) -> Option<String> {
    let proto = forwarded_scheme(headers)?;
    let host = header_str(headers, "x-forwarded-host")?;
    let uri = header_str(headers, "x-forwarded-uri").unwrap_or("/");
    Some(format!("{}://{}{}", proto, host, uri))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
