//! REST API for the dashboard
//!
//! This module exposes the device store, result log, template library and
//! the manual probe trigger over HTTP.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared state** holding the storage backend and probe executor
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/devices` - List devices
//! - `POST /api/devices` - Create or update a device
//! - `DELETE /api/devices/:id` - Delete a device and its logs
//! - `GET /api/devices/:id/logs` - Recent log entries
//! - `GET /api/templates` - List templates
//! - `POST /api/templates` - Create a template
//! - `POST /api/run-now` - Run one probe without persisting it

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:4000")
    pub bind_addr: SocketAddr,

    /// Enable permissive CORS for the dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                crate::util::get_default_port(),
            ),
            enable_cors: true,
        }
    }
}

/// Build the API router
#[cfg(feature = "api")]
pub fn router(state: ApiState, enable_cors: bool) -> axum::Router {
    use axum::routing::{delete, get, post};
    use tower::ServiceBuilder;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = enable_cors.then(|| {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    });

    axum::Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route(
            "/api/devices",
            get(routes::devices::list_devices).post(routes::devices::upsert_device),
        )
        .route("/api/devices/:id", delete(routes::devices::delete_device))
        .route("/api/devices/:id/logs", get(routes::devices::device_logs))
        .route(
            "/api/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route("/api/run-now", post(routes::run_now::run_now))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .option_layer(cors),
        )
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use anyhow::Context;
    use tracing::info;

    info!("starting API server on {}", config.bind_addr);

    let app = router(state, config.enable_cors);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
