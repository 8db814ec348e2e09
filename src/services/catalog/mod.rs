/// Catalog source abstraction
///
/// The recommender only needs a list of movies with cover references. Where
/// that list lives (Postgres, a JSON export, a fixture) is pluggable.
use crate::{error::AppResult, models::CatalogItem};

pub mod file;
pub mod postgres;

pub use file::JsonFileCatalogSource;
pub use postgres::PgCatalogSource;

/// Yields the movies to rank for one request
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Loads every catalog record; failure here is fatal to the request
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Fixed catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogSource {
    items: Vec<CatalogItem>,
}

impl InMemoryCatalogSource {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>> {
        Ok(self.items.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
