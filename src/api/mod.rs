//! HTTP surface of the publisher
//!
//! Exposes publish triggers, run progress and a live event stream over HTTP,
//! with an OpenAPI 3.1 description of every route.

use crate::{Config, Error, Result, SnapshotPublisher};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Router with every route, plus the layers the configuration asks for
///
/// # Routes
///
/// ## Publishing
/// - `POST /snapshot-uploader/upload-all` - Publish every registered channel
/// - `POST /snapshot-uploader/upload-selected` - Publish the channels in the JSON body
/// - `GET /snapshot-uploader/get-available-channels` - List channel names
///
/// ## Processes
/// - `GET /processes` - List all runs
/// - `GET /processes/:id` - Get one run
/// - `POST /processes/:id/cancel` - Request cancellation
///
/// ## System
/// - `GET /health` - Liveness and queue depth (never needs an API key)
/// - `GET /openapi.json` - Generated OpenAPI document
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled, backed by `/api-docs/openapi.json`)
/// - `GET /events` - Run events as server-sent events
pub fn create_router(publisher: Arc<SnapshotPublisher>, config: Arc<Config>) -> Router {
    let state = AppState::new(publisher, config.clone());

    let router = Router::new()
        // Publishing
        .route("/snapshot-uploader/upload-all", post(routes::upload_all))
        .route(
            "/snapshot-uploader/upload-selected",
            post(routes::upload_selected),
        )
        .route(
            "/snapshot-uploader/get-available-channels",
            get(routes::available_channels),
        )
        // Processes
        .route("/processes", get(routes::list_processes))
        .route("/processes/:id", get(routes::get_process))
        .route("/processes/:id/cancel", post(routes::cancel_process))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    let api = &config.server.api;
    let router = if api.swagger_ui {
        // Served under its own path so it cannot shadow `/openapi.json`
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let mut app = router.with_state(state).layer(TraceLayer::new_for_http());

    if let Some(key) = api.api_key.clone() {
        app = app.layer(middleware::from_fn_with_state(Some(key), auth::require_api_key));
    }

    // Outermost, so preflight requests never reach authentication
    if api.cors_enabled {
        app = app.layer(cors_for(&api.cors_origins));
    }

    app
}

/// CORS policy for `origins`; `"*"` or an empty list means any origin
fn cors_for(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    base.allow_origin(AllowOrigin::list(parsed))
}

/// Bind the configured address and serve the API until the server fails or
/// the task is aborted
///
/// # Example
///
/// ```no_run
/// use snapshot_publisher::{ChannelRegistry, Config, KeyValueSink, SnapshotPublisher};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let publisher = SnapshotPublisher::new(
///     (*config).clone(),
///     Arc::new(ChannelRegistry::new()),
///     Arc::new(KeyValueSink::new()),
/// )
/// .await?;
///
/// snapshot_publisher::api::start_api_server(Arc::new(publisher), config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(publisher: Arc<SnapshotPublisher>, config: Arc<Config>) -> Result<()> {
    let address = config.server.api.bind_address;
    let listener = TcpListener::bind(address).await.map_err(Error::Io)?;
    tracing::info!(%address, "API server listening");

    let app = create_router(publisher, config);
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!(%address, "API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
