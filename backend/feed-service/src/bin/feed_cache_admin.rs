/// Drops the shared global feed cache entry.
///
/// Usage:
///   cargo run --bin feed-cache-admin
///
/// Environment variables:
///   REDIS_URL - Redis connection string (required)
///   LOG_LEVEL - Optional, default "info"
use anyhow::{Context, Result};
use feed_service::cache::{FeedCache, RedisCacheBackend};
use feed_service::services::{FeedSnapshot, GLOBAL_FEED_CACHE_KEY};
use feed_service::Config;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.app.log_level.clone().into()),
        )
        .init();

    let redis = config
        .redis
        .as_ref()
        .context("REDIS_URL environment variable not set")?;

    let backend = RedisCacheBackend::connect(&redis.url)
        .await
        .context("Failed to connect to Redis")?;
    backend.ping().await.context("Redis health check failed")?;

    let cache: FeedCache<FeedSnapshot> = FeedCache::new(Arc::new(backend));
    cache
        .invalidate(GLOBAL_FEED_CACHE_KEY)
        .await
        .context("Failed to invalidate global feed cache")?;

    info!(env = %config.app.env, key = GLOBAL_FEED_CACHE_KEY, "Global feed cache invalidated");
    Ok(())
}
