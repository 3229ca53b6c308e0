/// Configuration management for Feed Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::services::follow::UnfollowPolicy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    /// PostgreSQL record store; absent when running against the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Shared Redis feed cache; absent means a process-local cache
    pub redis: Option<RedisConfig>,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
}

/// Feed assembly settings shared by every feed kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Global feed cache TTL in seconds
    #[serde(default = "default_global_cache_ttl_secs")]
    pub global_cache_ttl_secs: u64,
    #[serde(default)]
    pub unfollow_policy: UnfollowPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            global_cache_ttl_secs: default_global_cache_ttl_secs(),
            unfollow_policy: UnfollowPolicy::default(),
        }
    }
}

impl FeedConfig {
    pub fn page_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn global_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.global_cache_ttl_secs)
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_page_size() -> usize {
    10
}

fn default_global_cache_ttl_secs() -> u64 {
    20
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let database = match std::env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_connections),
            }),
            Err(_) => None,
        };

        let redis = std::env::var("REDIS_URL")
            .ok()
            .map(|url| RedisConfig { url });

        let page_size = match std::env::var("FEED_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .context("FEED_PAGE_SIZE must be a positive integer")?,
            Err(_) => default_page_size(),
        };
        if page_size == 0 {
            bail!("FEED_PAGE_SIZE must be greater than zero");
        }

        let global_cache_ttl_secs = match std::env::var("FEED_GLOBAL_CACHE_TTL_SECS") {
            Ok(raw) => raw
                .parse()
                .context("FEED_GLOBAL_CACHE_TTL_SECS must be a non-negative integer")?,
            Err(_) => default_global_cache_ttl_secs(),
        };

        let strict_unfollow: bool = std::env::var("FEED_UNFOLLOW_STRICT")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .context("FEED_UNFOLLOW_STRICT must be true or false")?;

        Ok(Config {
            app,
            database,
            redis,
            feed: FeedConfig {
                page_size,
                global_cache_ttl_secs,
                unfollow_policy: if strict_unfollow {
                    UnfollowPolicy::Strict
                } else {
                    UnfollowPolicy::Lenient
                },
            },
        })
    }
}
