use chrono::Utc;

use crate::{
    error::{AppError, AppResult, ItemError},
    models::{RecommendationQuery, RecommendationReport},
    services::{
        cancel::Cancellation, catalog::CatalogSource, pipeline::CatalogPipeline,
        recommender::recommend,
    },
};

/// Finds the catalog movies whose covers look most like the query cover
///
/// The query is featurized first so a bad query image fails fast, before the
/// catalog is fetched. Catalog items that fail are reported alongside the
/// ranking instead of failing the request. `cancellation` covers both the
/// query fetch and the catalog run.
#[tracing::instrument(skip_all, fields(source = catalog.name(), top_n = top_n))]
pub async fn recommend_similar(
    catalog: &dyn CatalogSource,
    pipeline: &CatalogPipeline,
    query: RecommendationQuery,
    top_n: usize,
    cancellation: Cancellation,
) -> AppResult<RecommendationReport> {
    if query.image_reference.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "image_reference cannot be empty".to_string(),
        ));
    }

    let mut signal = cancellation.clone();
    let featurized = tokio::select! {
        biased;
        _ = signal.cancelled() => Err(ItemError::Cancelled),
        result = pipeline.featurize(&query.image_reference) => result,
    };

    let query_features = featurized.map_err(|e| {
        tracing::warn!(
            reference = %query.image_reference,
            error = %e,
            "Query image could not be featurized"
        );
        AppError::QueryImage(e)
    })?;

    let items = catalog.load_catalog().await?;

    let run = pipeline.process(items, cancellation).await?;
    let ranked = recommend(&query_features, &run.scored, top_n);

    let report = RecommendationReport {
        query,
        ranked,
        failures: run.failures,
        cancelled: run.cancelled,
        generated_at: Utc::now(),
    };

    if report.skipped_count() > 0 {
        tracing::warn!(
            skipped = report.skipped_count(),
            "Catalog items skipped due to image errors"
        );
    }

    tracing::info!(
        recommendations = report.ranked.recommendations.len(),
        "Recommendations ready"
    );

    Ok(report)
}
