use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{
    db::{Cache, CacheKey},
    db::redis::FEATURE_CACHE_TTL,
    error::{AppError, AppResult, ItemError},
    models::{CatalogItem, CatalogRun, FeatureVector, ItemFailure, ItemId, Resolution, ScoredItem},
    services::{cancel::Cancellation, extractor::FeatureExtractor, fetcher::ImageFetcher},
};

/// Items processed at once when nothing else is configured
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Fetches and featurizes catalog covers with bounded concurrency
///
/// Every item ends up either scored or recorded as a failure; one broken
/// cover never aborts the run.
pub struct CatalogPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    extractor: Arc<dyn FeatureExtractor>,
    concurrency_limit: usize,
    cache: Option<FeatureCache>,
}

/// Feature cache plus the resolution its keys are scoped to
#[derive(Clone)]
struct FeatureCache {
    cache: Cache,
    resolution: Resolution,
}

impl CatalogPipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        extractor: Arc<dyn FeatureExtractor>,
        concurrency_limit: usize,
    ) -> AppResult<Self> {
        if concurrency_limit == 0 {
            return Err(AppError::InvalidInput(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            fetcher,
            extractor,
            concurrency_limit,
            cache: None,
        })
    }

    /// Reuses catalog features from Redis, keyed by policy and `resolution`
    pub fn with_cache(mut self, cache: Cache, resolution: Resolution) -> Self {
        self.cache = Some(FeatureCache { cache, resolution });
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn extractor(&self) -> &dyn FeatureExtractor {
        self.extractor.as_ref()
    }

    /// Featurizes a single reference through the same stages as the catalog
    pub async fn featurize(&self, reference: &str) -> Result<FeatureVector, ItemError> {
        let worker = Worker {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            cache: None,
        };
        worker.featurize(reference).await
    }

    /// Runs fetch, normalize and extract over every item
    ///
    /// Returns once each item is terminal. Cancellation stops new work and
    /// aborts in-flight items; anything already featured is still returned.
    #[tracing::instrument(
        skip_all,
        fields(items = items.len(), extractor = %self.extractor.name())
    )]
    pub async fn process(
        &self,
        items: Vec<CatalogItem>,
        cancellation: Cancellation,
    ) -> AppResult<CatalogRun> {
        ensure_unique_ids(&items)?;

        let start = Instant::now();
        let total = items.len();

        tracing::info!(
            items = total,
            concurrency_limit = self.concurrency_limit,
            "Processing catalog"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (ItemId, String)> = HashMap::new();
        let mut run = CatalogRun::default();
        let mut signal = cancellation.clone();
        let mut pending = items.into_iter();

        for item in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    run.failures.push(cancelled(item));
                    break;
                }
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|e| AppError::Internal(format!("Concurrency gate closed: {}", e)))?,
            };

            let worker = self.worker();
            let mut item_signal = cancellation.clone();
            let item_id = item.id.clone();
            let reference = item.image_reference.clone();

            let handle = tasks.spawn(async move {
                let _permit = permit;
                let result = tokio::select! {
                    biased;
                    _ = item_signal.cancelled() => Err(ItemError::Cancelled),
                    result = worker.featurize(&item.image_reference) => result,
                };
                (item, result)
            });
            in_flight.insert(handle.id(), (item_id, reference));
        }

        // Only non-empty when the loop stopped on cancellation
        run.failures.extend(pending.map(cancelled));

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, (item, result))) => {
                    in_flight.remove(&task_id);
                    match result {
                        Ok(features) => run.scored.push(ScoredItem::new(item, features)),
                        Err(error) => {
                            tracing::debug!(
                                item_id = %item.id,
                                reference = %item.image_reference,
                                error = %error,
                                "Catalog item failed"
                            );
                            run.failures.push(ItemFailure {
                                item_id: item.id,
                                image_reference: item.image_reference,
                                error,
                            });
                        }
                    }
                }
                Err(join_error) => {
                    let Some((item_id, image_reference)) = in_flight.remove(&join_error.id())
                    else {
                        tracing::error!(error = %join_error, "Untracked catalog task failed");
                        continue;
                    };
                    let error = if join_error.is_panic() {
                        tracing::error!(
                            item_id = %item_id,
                            error = %join_error,
                            "Catalog task panicked"
                        );
                        ItemError::Panicked(join_error.to_string())
                    } else {
                        tracing::debug!(item_id = %item_id, "Catalog task aborted");
                        ItemError::Cancelled
                    };
                    run.failures.push(ItemFailure {
                        item_id,
                        image_reference,
                        error,
                    });
                }
            }
        }

        run.scored.sort_by(|a, b| a.item.id.cmp(&b.item.id));
        run.failures.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        run.cancelled = run
            .failures
            .iter()
            .any(|failure| failure.error == ItemError::Cancelled);

        if !run.failures.is_empty() {
            tracing::warn!(
                success_count = run.scored.len(),
                error_count = run.failures.len(),
                cancelled = run.cancelled,
                "Partial catalog featurization"
            );
        }

        tracing::info!(
            scored = run.scored.len(),
            failed = run.failures.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Catalog processed"
        );

        Ok(run)
    }

    fn worker(&self) -> Worker {
        Worker {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            cache: self.cache.clone(),
        }
    }
}

fn ensure_unique_ids(items: &[CatalogItem]) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(&item.id) {
            return Err(AppError::InvalidInput(format!(
                "duplicate catalog item id {}",
                item.id
            )));
        }
    }
    Ok(())
}

fn cancelled(item: CatalogItem) -> ItemFailure {
    ItemFailure {
        item_id: item.id,
        image_reference: item.image_reference,
        error: ItemError::Cancelled,
    }
}

/// Everything one spawned task needs to featurize one item
struct Worker {
    fetcher: Arc<dyn ImageFetcher>,
    extractor: Arc<dyn FeatureExtractor>,
    cache: Option<FeatureCache>,
}

impl Worker {
    async fn featurize(&self, reference: &str) -> Result<FeatureVector, ItemError> {
        let key = self.cache.as_ref().map(|c| CacheKey::Feature {
            policy: self.extractor.name().to_string(),
            resolution: c.resolution,
            reference: reference.to_string(),
        });

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            let lookup = cache.cache.get_from_cache::<FeatureVector>(key).await;
            if let Some(features) = usable_cached(lookup, self.extractor.dimensions()) {
                tracing::debug!(reference = %reference, "Feature cache hit");
                return Ok(features);
            }
        }

        let image = self.fetcher.fetch(reference).await?;
        let features = self.extractor.extract(&image)?;

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache
                .cache
                .set_in_background(key, &features, FEATURE_CACHE_TTL);
        }

        Ok(features)
    }
}

/// Keeps a cached vector only if it fits the current extractor
///
/// Read errors and stale shapes are misses; they never fail the item.
fn usable_cached(
    lookup: AppResult<Option<FeatureVector>>,
    dimensions: usize,
) -> Option<FeatureVector> {
    match lookup {
        Ok(Some(features)) if features.len() == dimensions => Some(features),
        Ok(Some(features)) => {
            tracing::debug!(
                cached = features.len(),
                expected = dimensions,
                "Cached features have stale dimensions"
            );
            None
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Feature cache read failed");
            None
        }
    }
}
