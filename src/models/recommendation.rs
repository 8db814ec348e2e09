use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CatalogItem, ItemFailure, ItemId, RecommendationQuery};

/// One ranked catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub item: CatalogItem,
    pub distance: f64,
}

/// A catalog vector whose length does not match the query vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionMismatch {
    pub item_id: ItemId,
    pub expected: usize,
    pub actual: usize,
}

/// Ranking output: most similar first, plus anything excluded for shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResult {
    pub recommendations: Vec<Recommendation>,
    pub mismatches: Vec<DimensionMismatch>,
}

impl RankedResult {
    pub fn ids(&self) -> Vec<ItemId> {
        self.recommendations
            .iter()
            .map(|r| r.item.id.clone())
            .collect()
    }
}

/// Everything a caller needs to present one recommendation request
#[derive(Debug, Clone)]
pub struct RecommendationReport {
    pub query: RecommendationQuery,
    pub ranked: RankedResult,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationReport {
    pub fn skipped_count(&self) -> usize {
        self.failures.len() + self.ranked.mismatches.len()
    }
}

// ============================================================================
// API response types
// ============================================================================

/// Recommendation as shown to clients
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationView {
    pub id: ItemId,
    pub title: String,
    pub genre: String,
    pub image_reference: String,
    pub distance: f64,
}

impl From<&Recommendation> for RecommendationView {
    fn from(rec: &Recommendation) -> Self {
        Self {
            id: rec.item.id.clone(),
            title: rec.item.title.clone(),
            genre: rec.item.genre.clone(),
            image_reference: rec.item.image_reference.clone(),
            distance: rec.distance,
        }
    }
}

/// Catalog item left out of ranking because its cover failed
#[derive(Debug, Clone, Serialize)]
pub struct SkippedItemView {
    pub id: ItemId,
    pub image_reference: String,
    pub kind: &'static str,
    pub reason: String,
}

impl From<&ItemFailure> for SkippedItemView {
    fn from(failure: &ItemFailure) -> Self {
        Self {
            id: failure.item_id.clone(),
            image_reference: failure.image_reference.clone(),
            kind: failure.error.kind(),
            reason: failure.error.to_string(),
        }
    }
}

/// Response body for `POST /api/v1/recommendations`
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub query_title: Option<String>,
    pub recommendations: Vec<RecommendationView>,
    pub skipped: Vec<SkippedItemView>,
    pub excluded: Vec<DimensionMismatch>,
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

impl From<RecommendationReport> for RecommendationResponse {
    fn from(report: RecommendationReport) -> Self {
        Self {
            query_title: report.query.title,
            recommendations: report
                .ranked
                .recommendations
                .iter()
                .map(RecommendationView::from)
                .collect(),
            skipped: report.failures.iter().map(SkippedItemView::from).collect(),
            excluded: report.ranked.mismatches,
            cancelled: report.cancelled,
            generated_at: report.generated_at,
        }
    }
}
