use std::path::PathBuf;

use crate::{
    error::{AppError, AppResult},
    models::CatalogItem,
    services::catalog::CatalogSource,
};

/// Reads a JSON array of catalog records from disk on every load
#[derive(Debug, Clone)]
pub struct JsonFileCatalogSource {
    path: PathBuf,
}

impl JsonFileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CatalogSource for JsonFileCatalogSource {
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Catalog(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let items: Vec<CatalogItem> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Catalog(format!("invalid catalog file {}: {}", self.path.display(), e))
        })?;

        tracing::info!(
            items = items.len(),
            path = %self.path.display(),
            source = "file",
            "Catalog loaded"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
