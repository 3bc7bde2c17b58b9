//! Ethergate application entry point.
//!
//! Bootstraps the gateway:
//! 1. Load configuration from environment
//! 2. Load the authorized-address file
//! 3. Connect to Redis
//! 4. Build router with login/forward-auth routes + static file serving
//! 5. Apply security headers middleware
//! 6. Start Axum server

use ethergate::{
    allowlist::AllowList, auth::extract::AppState, config::Config, middleware::security_headers,
    routes,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting ethergate on {}", config.bind_addr);
    let bind_addr = config.bind_addr;

    // Load the authorized-address file; refusing to start without it is
    // the point of the gateway
    let allowlist =
        AllowList::load(&config.allowlist_file).expect("Failed to load authorized addresses");
    if allowlist.is_empty() {
        tracing::warn!(
            action = "allowlist_empty",
            "authorized-address file has no entries; every login will be denied"
        );
    } else {
        tracing::info!(
            action = "allowlist_loaded",
            addresses = allowlist.len(),
            "authorized addresses loaded"
        );
    }

    // Connect to Redis
    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    // Verify Redis connection
    let mut con = redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");
    let _: String = redis::cmd("PING")
        .query_async(&mut con)
        .await
        .expect("Redis PING failed");

    // Build shared state
    let state = AppState {
        redis: redis_client,
        config: Arc::new(config),
        allowlist: Arc::new(allowlist),
    };

    // Build router:
    // - Login and forward-auth routes (with state)
    // - Static file serving (fallback)
    // - Security headers middleware
    // Explicit CORS: deny all cross-origin requests (single-origin deployment).
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    let cors = CorsLayer::new();

    let app = routes::router()
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    // Start server (with_connect_info required for ConnectInfo<SocketAddr> extractors)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
