//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to all responses.
///
/// - **Cache-Control: no-store**
///   Challenge nonces and session status must never be served from a
///   cache.
///
/// - **Referrer-Policy: no-referrer**
///   Continuation targets in the login URL's query string must not leak
///   via the Referer header.
///
/// - **X-Content-Type-Options: nosniff**
///   Forces browsers to respect declared Content-Type headers.
///
/// - **X-Frame-Options: DENY**
///   The login page must not be framable; a framed signing prompt is a
///   clickjacking vector.
///
/// - **Strict-Transport-Security**
///   Forces HTTPS connections for 2 years (including subdomains) and
///   enables HSTS preloading to prevent downgrade attacks.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
    );

    response
}
