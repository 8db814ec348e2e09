use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{catalog::CatalogSource, pipeline::CatalogPipeline},
};

pub mod recommendations;

/// Shared state handed to every handler
///
/// Holds no catalog data; each request loads and featurizes the catalog it
/// ranks against.
pub struct AppState {
    pub catalog: Arc<dyn CatalogSource>,
    pub pipeline: Arc<CatalogPipeline>,
    /// Used when a request does not specify `top_n`
    pub default_top_n: usize,
    /// Budget for featurizing the catalog in one request
    pub catalog_deadline: Option<Duration>,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/recommendations", post(recommendations::recommend))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
