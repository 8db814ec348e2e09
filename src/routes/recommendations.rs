use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationQuery, RecommendationResponse},
    routes::AppState,
    services::{cancel::cancellation, recommendations, recommender::validate_top_n},
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub image_reference: String,
    /// Defaults to the configured `top_n`
    #[serde(default)]
    pub top_n: Option<i64>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_n = match request.top_n {
        Some(top_n) => validate_top_n(top_n)?,
        None => state.default_top_n,
    };

    tracing::info!(
        request_id = %request_id,
        top_n,
        reference = %request.image_reference,
        "Processing recommendation request"
    );

    let (handle, signal) = cancellation();
    let deadline = state.catalog_deadline.map(|deadline| handle.cancel_after(deadline));

    let query = RecommendationQuery {
        title: request.title,
        image_reference: request.image_reference,
    };

    let result = recommendations::recommend_similar(
        state.catalog.as_ref(),
        &state.pipeline,
        query,
        top_n,
        signal,
    )
    .await;

    if let Some(timer) = deadline {
        timer.abort();
    }

    let report = result?;

    tracing::info!(
        request_id = %request_id,
        recommendations = report.ranked.recommendations.len(),
        skipped = report.skipped_count(),
        cancelled = report.cancelled,
        "Recommendation request completed"
    );

    Ok(Json(RecommendationResponse::from(report)))
}
