//! Record store abstraction
//!
//! The feed core never walks object graphs; it asks the store for exactly
//! the projection it needs. Every `list_*` method returns records already
//! in feed order.

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

use crate::error::FeedResult;
use crate::models::{Comment, CommentDraft, Group, Post, PostChanges, PostDraft, UserRef};
use std::cmp::Ordering;
use uuid::Uuid;

/// Which posts a feed scan selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    ByGroup(Uuid),
    ByAuthor(Uuid),
    /// Posts whose author is followed by the given user
    ByFollowedAuthorsOf(Uuid),
}

/// Durable storage for posts, groups, comments, users and follow edges.
///
/// Implementations enforce the follow-edge invariants structurally: at most
/// one edge per (follower, followee) pair, and no edge from a user to itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Posts matching `filter`, newest first with id as tiebreak
    async fn list_posts(&self, filter: PostFilter) -> FeedResult<Vec<Post>>;

    async fn resolve_group(&self, slug: &str) -> FeedResult<Option<Group>>;

    async fn resolve_user(&self, username: &str) -> FeedResult<Option<UserRef>>;

    /// Mirror a user from the identity layer. Posts, comments and follow
    /// edges reference users by id, so the author or follower must be
    /// mirrored before any of those rows are written.
    async fn upsert_user(&self, user: &UserRef) -> FeedResult<()>;

    /// Insert the edge unless it exists. Returns true if a new edge was created.
    async fn create_follow_edge(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool>;

    /// Returns true if an edge was removed
    async fn delete_follow_edge(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool>;

    async fn follow_edge_exists(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool>;

    async fn get_post(&self, post_id: i64) -> FeedResult<Option<Post>>;

    async fn insert_post(&self, draft: PostDraft) -> FeedResult<Post>;

    /// Returns `None` if the post does not exist
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> FeedResult<Option<Post>>;

    /// Deletes the post and its comments. Returns true if the post existed.
    async fn delete_post(&self, post_id: i64) -> FeedResult<bool>;

    /// Comments under a post, oldest first
    async fn list_comments(&self, post_id: i64) -> FeedResult<Vec<Comment>>;

    async fn insert_comment(&self, draft: CommentDraft) -> FeedResult<Comment>;
}

/// Feed order: newest first, higher id first on equal timestamps
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: i64, secs: i64) -> Post {
        Post {
            id,
            author_id: Uuid::nil(),
            text: format!("post {id}"),
            group_id: None,
            image: None,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_newest_first_uses_id_as_tiebreak() {
        let mut posts = vec![post(1, 100), post(3, 50), post(2, 100), post(4, 200)];
        posts.sort_by(newest_first);
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);
    }
}
