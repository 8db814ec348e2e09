use std::sync::Arc;

use tracing::info;

use crate::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, CacheWriterHandle},
    services::{
        catalog::{CatalogSource, JsonFileCatalogSource, PgCatalogSource},
        fetcher::{FetchOptions, HttpImageFetcher},
        pipeline::CatalogPipeline,
    },
};

/// Everything a front end needs to answer recommendation queries
pub struct Components {
    pub catalog: Arc<dyn CatalogSource>,
    pub pipeline: Arc<CatalogPipeline>,
    /// Present when the Redis feature cache is enabled; shut down on exit
    pub cache_writer: Option<CacheWriterHandle>,
}

/// Wires fetcher, extractor, optional cache and catalog source from config
pub async fn build_components(config: &Config) -> anyhow::Result<Components> {
    let resolution = config.target_resolution()?;
    let fetcher = HttpImageFetcher::new(FetchOptions::from_config(config)?)?;
    let extractor = config.feature_extractor()?;

    let mut pipeline =
        CatalogPipeline::new(Arc::new(fetcher), extractor, config.concurrency_limit)?;

    let mut cache_writer = None;
    if let Some(redis_url) = &config.redis_url {
        let client = create_redis_client(redis_url)?;
        let (cache, handle) = Cache::new(client);
        pipeline = pipeline.with_cache(cache, resolution);
        cache_writer = Some(handle);
        info!("Feature cache enabled");
    }

    let catalog: Arc<dyn CatalogSource> = match &config.catalog_file {
        Some(path) => Arc::new(JsonFileCatalogSource::new(path)),
        None => Arc::new(PgCatalogSource::new(create_pool(&config.database_url).await?)),
    };

    info!(
        source = catalog.name(),
        extractor = pipeline.extractor().name(),
        concurrency_limit = pipeline.concurrency_limit(),
        resolution = %resolution,
        "Recommendation components ready"
    );

    Ok(Components {
        catalog,
        pipeline: Arc::new(pipeline),
        cache_writer,
    })
}
