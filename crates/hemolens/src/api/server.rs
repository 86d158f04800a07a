//! API server setup.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{analyze_handler, root_handler};
use super::types::ApiState;
use crate::agent::{GeminiProvider, Pipeline};
use crate::config::AppConfig;
use crate::report::ReportReader;
use crate::{HemolensError, Result};

/// Create the API router with all routes configured.
///
/// Public so the router can be embedded in a larger application (and driven
/// directly in tests).
pub fn create_router(state: ApiState) -> Router {
    let cors_layer = cors_from_env();
    let max_body = state.config.max_upload_size_bytes;

    Router::new()
        .route("/", get(root_handler))
        .route("/analyze", post(analyze_handler))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: permissive by default, explicit origins via
/// `HEMOLENS_CORS_ORIGINS` (comma-separated) for production.
fn cors_from_env() -> CorsLayer {
    if let Ok(origins_str) = std::env::var("HEMOLENS_CORS_ORIGINS") {
        let origins: Vec<_> = origins_str
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if !origins.is_empty() {
            tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
            return CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any);
        }
        tracing::warn!("HEMOLENS_CORS_ORIGINS set but empty/invalid, falling back to permissive CORS");
    }
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

/// Start the API server.
///
/// Builds the production provider and the deployed medical pipeline from
/// `config`, binds `host:port`, and serves until shutdown.
pub async fn serve(host: &str, port: u16, config: AppConfig) -> Result<()> {
    let provider = Arc::new(GeminiProvider::new(&config));
    let reader = Arc::new(ReportReader::new());
    let state = ApiState {
        config: Arc::new(config),
        pipeline: Arc::new(Pipeline::medical(provider, reader)),
    };

    let ip: IpAddr = host
        .parse()
        .map_err(|e| HemolensError::validation(format!("Invalid host address: {e}")))?;
    let addr = SocketAddr::new(ip, port);

    tracing::info!("Starting Blood Test Report Analyser API on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(HemolensError::Io)?;

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| HemolensError::Other(e.to_string()))?;

    Ok(())
}
