mod catalog;
mod feature;
mod recommendation;

pub use catalog::{CatalogItem, ItemId, RecommendationQuery};
pub use feature::{
    CatalogRun, FeatureVector, ItemFailure, NormalizedImage, Resolution, ScoredItem,
};
pub use recommendation::{
    DimensionMismatch, RankedResult, Recommendation, RecommendationReport,
    RecommendationResponse, RecommendationView, SkippedItemView,
};
