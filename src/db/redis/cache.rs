use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::Resolution;

/// How long an extracted feature vector stays cached
pub const FEATURE_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Feature vector of one image under one policy and resolution
    Feature {
        policy: String,
        resolution: Resolution,
        reference: String,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Feature {
                policy,
                resolution,
                reference,
            } => write!(f, "feature:{}:{}:{}", policy, resolution, reference.trim()),
        }
    }
}

/// Creates a Redis client for the feature cache
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed cache with a background writer
///
/// Reads go straight to Redis; writes are queued so pipeline workers never
/// wait on them.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Stops the writer task after it drains queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.writer.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Creates the cache and spawns its writer task
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let writer = tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, writer })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Feature cache writer started");
        let mut written: u64 = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    match Self::write_to_redis(&client, msg).await {
                        Ok(()) => written += 1,
                        Err(e) => tracing::warn!(error = %e, "Feature cache write failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Drain what is already queued; new senders may still exist
                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        match Self::write_to_redis(&client, msg).await {
                            Ok(()) => written += 1,
                            Err(e) => tracing::warn!(error = %e, "Feature cache flush failed"),
                        }
                    }
                    break;
                }
            }
        }

        tracing::info!(written, "Feature cache writer stopped");
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Looks up a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a write without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if self.write_tx.send(msg).is_err() {
            tracing::debug!(key = %key, "Feature cache writer stopped, write dropped");
        }
    }
}
