use super::{newest_first, PostFilter, RecordStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{FeedError, FeedResult};
use crate::models::{
    Comment, CommentDraft, FollowEdge, Group, Post, PostChanges, PostDraft, UserRef,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRef>,
    groups: HashMap<Uuid, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    /// Keyed by (follower, followee); the key is the uniqueness constraint
    follows: HashMap<(Uuid, Uuid), FollowEdge>,
    last_post_id: i64,
    last_comment_id: i64,
}

/// Record store held entirely in process memory.
///
/// Writes are serialized through a single lock, so each operation is atomic.
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Follow edges are timestamped with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }

    /// Register a user. Usernames are unique.
    pub async fn add_user(&self, username: &str) -> FeedResult<UserRef> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(FeedError::Validation(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let user = UserRef {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Create a group. Slugs are unique.
    pub async fn add_group(&self, title: &str, slug: &str, description: &str) -> FeedResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == slug) {
            return Err(FeedError::Validation(format!(
                "group slug '{}' is already taken",
                slug
            )));
        }

        let group = Group {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Remove a group. Its posts survive with no group.
    pub async fn delete_group(&self, group_id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&group_id).is_none() {
            return false;
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        true
    }

    pub async fn follow_edge_count(&self) -> usize {
        self.tables.read().await.follows.len()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_posts(&self, filter: PostFilter) -> FeedResult<Vec<Post>> {
        let tables = self.tables.read().await;

        let mut posts: Vec<Post> = match filter {
            PostFilter::All => tables.posts.values().cloned().collect(),
            PostFilter::ByGroup(group_id) => tables
                .posts
                .values()
                .filter(|p| p.group_id == Some(group_id))
                .cloned()
                .collect(),
            PostFilter::ByAuthor(author_id) => tables
                .posts
                .values()
                .filter(|p| p.author_id == author_id)
                .cloned()
                .collect(),
            PostFilter::ByFollowedAuthorsOf(follower_id) => {
                let followed: HashSet<Uuid> = tables
                    .follows
                    .keys()
                    .filter(|(follower, _)| *follower == follower_id)
                    .map(|(_, followee)| *followee)
                    .collect();
                tables
                    .posts
                    .values()
                    .filter(|p| followed.contains(&p.author_id))
                    .cloned()
                    .collect()
            }
        };

        posts.sort_by(newest_first);
        Ok(posts)
    }

    async fn resolve_group(&self, slug: &str) -> FeedResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn resolve_user(&self, username: &str) -> FeedResult<Option<UserRef>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn upsert_user(&self, user: &UserRef) -> FeedResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(FeedError::Validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn create_follow_edge(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool> {
        if follower_id == followee_id {
            return Err(FeedError::SelfFollow);
        }

        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        if tables.follows.contains_key(&(follower_id, followee_id)) {
            return Ok(false);
        }
        tables.follows.insert(
            (follower_id, followee_id),
            FollowEdge {
                follower_id,
                followee_id,
                created_at: now,
            },
        );
        Ok(true)
    }

    async fn delete_follow_edge(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.follows.remove(&(follower_id, followee_id)).is_some())
    }

    async fn follow_edge_exists(&self, follower_id: Uuid, followee_id: Uuid) -> FeedResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.follows.contains_key(&(follower_id, followee_id)))
    }

    async fn get_post(&self, post_id: i64) -> FeedResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&post_id).cloned())
    }

    async fn insert_post(&self, draft: PostDraft) -> FeedResult<Post> {
        let mut tables = self.tables.write().await;
        tables.last_post_id += 1;
        let post = Post {
            id: tables.last_post_id,
            author_id: draft.author_id,
            text: draft.text,
            group_id: draft.group_id,
            image: draft.image,
            created_at: draft.created_at,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> FeedResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        post.image = changes.image;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: i64) -> FeedResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: i64) -> FeedResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn insert_comment(&self, draft: CommentDraft) -> FeedResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&draft.post_id) {
            return Err(FeedError::NotFound(format!("post {}", draft.post_id)));
        }
        tables.last_comment_id += 1;
        let comment = Comment {
            id: tables.last_comment_id,
            post_id: draft.post_id,
            author_id: draft.author_id,
            text: draft.text,
            created_at: draft.created_at,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, Duration, Utc};

    fn draft(author: &UserRef, text: &str, group: Option<&Group>, at: DateTime<Utc>) -> PostDraft {
        PostDraft {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|g| g.id),
            image: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_follow_edge_is_unique_per_pair() {
        let store = InMemoryRecordStore::with_clock(Arc::new(ManualClock::default()));
        let a = store.add_user("a").await.unwrap();
        let b = store.add_user("b").await.unwrap();

        assert!(store.create_follow_edge(a.id, b.id).await.unwrap());
        assert!(!store.create_follow_edge(a.id, b.id).await.unwrap());
        assert!(store.create_follow_edge(b.id, a.id).await.unwrap());
        assert_eq!(store.follow_edge_count().await, 2);
    }

    #[tokio::test]
    async fn test_self_edge_rejected_by_store() {
        let store = InMemoryRecordStore::new();
        let a = store.add_user("a").await.unwrap();

        let err = store.create_follow_edge(a.id, a.id).await.unwrap_err();
        assert!(matches!(err, FeedError::SelfFollow));
        assert_eq!(store.follow_edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_filters_return_newest_first() {
        let store = InMemoryRecordStore::new();
        let a = store.add_user("a").await.unwrap();
        let b = store.add_user("b").await.unwrap();
        let group = store.add_group("Rust", "rust", "").await.unwrap();
        let t0 = Utc::now();

        let p1 = store.insert_post(draft(&a, "one", Some(&group), t0)).await.unwrap();
        let p2 = store.insert_post(draft(&b, "two", None, t0)).await.unwrap();
        let p3 = store
            .insert_post(draft(&a, "three", None, t0 + Duration::seconds(1)))
            .await
            .unwrap();

        let ids = |posts: Vec<Post>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(
            ids(store.list_posts(PostFilter::All).await.unwrap()),
            vec![p3.id, p2.id, p1.id]
        );
        assert_eq!(
            ids(store.list_posts(PostFilter::ByAuthor(a.id)).await.unwrap()),
            vec![p3.id, p1.id]
        );
        assert_eq!(
            ids(store.list_posts(PostFilter::ByGroup(group.id)).await.unwrap()),
            vec![p1.id]
        );

        store.create_follow_edge(b.id, a.id).await.unwrap();
        assert_eq!(
            ids(store
                .list_posts(PostFilter::ByFollowedAuthorsOf(b.id))
                .await
                .unwrap()),
            vec![p3.id, p1.id]
        );
    }

    #[tokio::test]
    async fn test_deleting_group_keeps_posts() {
        let store = InMemoryRecordStore::new();
        let a = store.add_user("a").await.unwrap();
        let group = store.add_group("Rust", "rust", "").await.unwrap();
        let post = store
            .insert_post(draft(&a, "one", Some(&group), Utc::now()))
            .await
            .unwrap();

        assert!(store.delete_group(group.id).await);

        let kept = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(kept.group_id, None);
        assert!(store.resolve_group("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_post_removes_comments() {
        let store = InMemoryRecordStore::new();
        let a = store.add_user("a").await.unwrap();
        let post = store
            .insert_post(draft(&a, "one", None, Utc::now()))
            .await
            .unwrap();
        store
            .insert_comment(CommentDraft {
                post_id: post.id,
                author_id: a.id,
                text: "nice".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_comments(post.id).await.unwrap().is_empty());
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_user_renames_but_keeps_usernames_unique() {
        let store = InMemoryRecordStore::new();
        let a = store.add_user("a").await.unwrap();
        let b = store.add_user("b").await.unwrap();

        let renamed = UserRef {
            id: a.id,
            username: "alpha".to_string(),
        };
        store.upsert_user(&renamed).await.unwrap();
        assert_eq!(store.resolve_user("alpha").await.unwrap(), Some(renamed));
        assert!(store.resolve_user("a").await.unwrap().is_none());

        let clash = UserRef {
            id: Uuid::new_v4(),
            username: b.username.clone(),
        };
        assert!(matches!(
            store.upsert_user(&clash).await,
            Err(FeedError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let store = InMemoryRecordStore::new();
        store.add_group("Rust", "rust", "").await.unwrap();
        assert!(store.add_group("Rust again", "rust", "").await.is_err());
    }
}
