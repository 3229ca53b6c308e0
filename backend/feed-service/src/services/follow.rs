use crate::error::{FeedError, FeedResult};
use crate::models::{Post, UserRef};
use crate::repository::{PostFilter, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// What `unfollow` does when no edge exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfollowPolicy {
    /// Missing edge is a no-op, so retries are safe
    #[default]
    Lenient,
    /// Missing edge fails with `FeedError::NotFollowing`
    Strict,
}

/// Maintains the follower → followee relation and resolves following feeds
#[derive(Clone)]
pub struct FollowGraph {
    store: Arc<dyn RecordStore>,
    unfollow_policy: UnfollowPolicy,
}

impl FollowGraph {
    pub fn new(store: Arc<dyn RecordStore>, unfollow_policy: UnfollowPolicy) -> Self {
        Self {
            store,
            unfollow_policy,
        }
    }

    /// Get-or-create the edge. Returns true if a new edge was created.
    pub async fn follow(&self, follower: &UserRef, followee: &UserRef) -> FeedResult<bool> {
        if follower.id == followee.id {
            return Err(FeedError::SelfFollow);
        }

        let created = self
            .store
            .create_follow_edge(follower.id, followee.id)
            .await?;

        if created {
            info!(
                follower = %follower.username,
                followee = %followee.username,
                "Follow edge created"
            );
        }
        Ok(created)
    }

    /// Remove the edge. Returns true if an edge was removed.
    pub async fn unfollow(&self, follower: &UserRef, followee: &UserRef) -> FeedResult<bool> {
        if follower.id == followee.id {
            return Err(FeedError::SelfFollow);
        }

        let removed = self
            .store
            .delete_follow_edge(follower.id, followee.id)
            .await?;

        if removed {
            info!(
                follower = %follower.username,
                followee = %followee.username,
                "Follow edge removed"
            );
            return Ok(true);
        }

        match self.unfollow_policy {
            UnfollowPolicy::Lenient => Ok(false),
            UnfollowPolicy::Strict => Err(FeedError::NotFollowing),
        }
    }

    pub async fn is_following(&self, follower: &UserRef, followee: &UserRef) -> FeedResult<bool> {
        self.store
            .follow_edge_exists(follower.id, followee.id)
            .await
    }

    /// Posts by every author `follower` follows, newest first
    pub async fn feed_for(&self, follower: &UserRef) -> FeedResult<Vec<Post>> {
        self.store
            .list_posts(PostFilter::ByFollowedAuthorsOf(follower.id))
            .await
    }
}
