//! SPECTRA HTTP API
//!
//! Wraps the `spectra-lib` services in an axum router. Every domain route
//! lives under `/api`; health checks and metrics sit at the root.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, StateOptions};

use axum::http::HeaderValue;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .merge(routes::system::router())
        .nest("/api/instances", routes::instances::router())
        .nest("/api/budgets", routes::budgets::router())
        .nest("/api/anomalies", routes::anomalies::router())
        .nest("/api/regions", routes::regions::router())
        .nest("/api/optimizer", routes::optimizer::router())
        .nest("/api/migrations", routes::migrations::router())
        .nest("/api/scheduler", routes::scheduler::router())
        .nest("/api/dashboard", routes::dashboard::router())
        .nest("/api/reports", routes::reports::router())
        .nest("/api/settings", routes::settings::router())
        .nest("/api/admin", routes::admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
