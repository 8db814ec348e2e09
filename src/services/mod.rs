pub mod cancel;
pub mod catalog;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod recommendations;
pub mod recommender;

pub use cancel::{cancellation, CancelHandle, Cancellation};
pub use catalog::{CatalogSource, InMemoryCatalogSource, JsonFileCatalogSource, PgCatalogSource};
pub use extractor::{ColorHistogramExtractor, FeatureExtractor, MeanColorExtractor};
pub use fetcher::{FetchOptions, HttpImageFetcher, ImageFetcher};
pub use pipeline::{CatalogPipeline, DEFAULT_CONCURRENCY_LIMIT};
pub use recommendations::recommend_similar;
pub use recommender::{
    cosine_distance, recommend, validate_top_n, DISTANCE_RESOLUTION, ZERO_MAGNITUDE_DISTANCE,
};
