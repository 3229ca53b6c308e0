//! Feed assembly
//!
//! Entry point for feed reads and follow/unfollow by username. Only the
//! global feed goes through the cache; group, author and following feeds
//! depend on the request and are read straight from the store.

use crate::cache::FeedCache;
use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::metrics::FEED_REQUESTS;
use crate::models::{Group, Identity, Post, UserRef};
use crate::pagination::{paginate, Page};
use crate::repository::{PostFilter, RecordStore};
use crate::services::follow::FollowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Cache key of the global feed snapshot
pub const GLOBAL_FEED_CACHE_KEY: &str = "index_page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    /// Every post
    Global,
    /// Posts in the group with this slug
    Group(String),
    /// Posts by the user with this username
    Author(String),
    /// Posts by authors the requester follows
    Following,
}

impl FeedKind {
    fn label(&self) -> &'static str {
        match self {
            FeedKind::Global => "global",
            FeedKind::Group(_) => "group",
            FeedKind::Author(_) => "author",
            FeedKind::Following => "following",
        }
    }
}

/// What a feed page was resolved against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedContext {
    Global,
    Group { group: Group },
    Author { author: UserRef, following: bool },
    Following,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub page: Page<Post>,
    pub context: FeedContext,
}

/// Cached payload of the global feed.
///
/// The whole ordered list is cached under one key and every page is sliced
/// from it, so pages served within one TTL window never overlap or skip.
///
/// Every hit decodes the full list to serve one page, and the payload grows
/// with the posts table. Past a few thousand posts this should become a
/// bounded window of ids rather than whole rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub generated_at: DateTime<Utc>,
}

pub struct FeedAssembler {
    store: Arc<dyn RecordStore>,
    follows: FollowGraph,
    cache: FeedCache<FeedSnapshot>,
    clock: Arc<dyn Clock>,
    page_size: NonZeroUsize,
    global_ttl: Duration,
}

impl FeedAssembler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: FeedCache<FeedSnapshot>,
        clock: Arc<dyn Clock>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            follows: FollowGraph::new(Arc::clone(&store), config.unfollow_policy),
            store,
            cache,
            clock,
            page_size: config.page_size(),
            global_ttl: config.global_cache_ttl(),
        }
    }

    /// Assemble one page of the requested feed
    #[instrument(skip(self, kind, requester), fields(kind = kind.label()))]
    pub async fn get_feed(
        &self,
        kind: FeedKind,
        page_number: i64,
        requester: &Identity,
    ) -> FeedResult<FeedView> {
        FEED_REQUESTS.with_label_values(&[kind.label()]).inc();

        let (posts, context) = match kind {
            FeedKind::Global => {
                let snapshot = self.global_snapshot().await?;
                (snapshot.posts, FeedContext::Global)
            }
            FeedKind::Group(slug) => {
                let group = self
                    .store
                    .resolve_group(&slug)
                    .await?
                    .ok_or_else(|| FeedError::NotFound(format!("group '{}'", slug)))?;
                let posts = self.store.list_posts(PostFilter::ByGroup(group.id)).await?;
                (posts, FeedContext::Group { group })
            }
            FeedKind::Author(username) => {
                let author = self.resolve_user(&username).await?;
                let following = match requester.user() {
                    Some(user) => self.follows.is_following(user, &author).await?,
                    None => false,
                };
                let posts = self
                    .store
                    .list_posts(PostFilter::ByAuthor(author.id))
                    .await?;
                (posts, FeedContext::Author { author, following })
            }
            FeedKind::Following => {
                let user = requester.user().ok_or(FeedError::Unauthenticated)?;
                let posts = self.follows.feed_for(user).await?;
                (posts, FeedContext::Following)
            }
        };

        let page = paginate(&posts, self.page_size, page_number);
        debug!(
            page = page.number,
            total_pages = page.total_pages,
            items = page.len(),
            "Feed page assembled"
        );

        Ok(FeedView { page, context })
    }

    async fn global_snapshot(&self) -> FeedResult<FeedSnapshot> {
        self.cache
            .get_or_compute(GLOBAL_FEED_CACHE_KEY, self.global_ttl, || async {
                let posts = self.store.list_posts(PostFilter::All).await?;
                Ok::<_, FeedError>(FeedSnapshot {
                    posts,
                    generated_at: self.clock.now(),
                })
            })
            .await
    }

    async fn resolve_user(&self, username: &str) -> FeedResult<UserRef> {
        self.store
            .resolve_user(username)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("user '{}'", username)))
    }

    /// Follow `target_username` on behalf of the requester.
    /// Returns true if a new edge was created.
    pub async fn follow(&self, requester: &Identity, target_username: &str) -> FeedResult<bool> {
        let follower = requester.user().ok_or(FeedError::Unauthenticated)?;
        let followee = self.resolve_user(target_username).await?;
        if follower.id != followee.id {
            self.store.upsert_user(follower).await?;
        }
        self.follows.follow(follower, &followee).await
    }

    /// Unfollow `target_username` on behalf of the requester.
    /// Returns true if an edge was removed.
    pub async fn unfollow(&self, requester: &Identity, target_username: &str) -> FeedResult<bool> {
        let follower = requester.user().ok_or(FeedError::Unauthenticated)?;
        let followee = self.resolve_user(target_username).await?;
        self.follows.unfollow(follower, &followee).await
    }

    /// Administrative hook: drop the cached global feed now.
    /// No write path calls this.
    pub async fn invalidate_global_feed_cache(&self) -> FeedResult<()> {
        self.cache
            .invalidate(GLOBAL_FEED_CACHE_KEY)
            .await
            .map_err(|e| FeedError::Internal(format!("Global feed invalidation failed: {}", e)))?;
        info!("Global feed cache invalidated");
        Ok(())
    }
}
