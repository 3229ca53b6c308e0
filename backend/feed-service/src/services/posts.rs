use crate::clock::Clock;
use crate::error::{FeedError, FeedResult};
use crate::models::{
    Comment, CommentDraft, Identity, NewComment, NewPost, Post, PostChanges, PostDetail,
    PostDraft, PostUpdate, UserRef,
};
use crate::repository::RecordStore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Post authoring and comments.
///
/// Writes here never touch the feed cache; the global feed catches up when
/// its entry expires.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_post(&self, requester: &Identity, input: NewPost) -> FeedResult<Post> {
        let author = requester.user().ok_or(FeedError::Unauthenticated)?;
        input.validate()?;

        let group_id = self.resolve_group_id(input.group_slug.as_deref()).await?;
        self.store.upsert_user(author).await?;
        let post = self
            .store
            .insert_post(PostDraft {
                author_id: author.id,
                text: input.text,
                group_id,
                image: input.image,
                created_at: self.clock.now(),
            })
            .await?;

        info!(post_id = post.id, author = %author.username, "Post created");
        Ok(post)
    }

    /// Update a post's text, group and image. Only the author may edit.
    pub async fn edit_post(
        &self,
        requester: &Identity,
        post_id: i64,
        input: PostUpdate,
    ) -> FeedResult<Post> {
        let user = requester.user().ok_or(FeedError::Unauthenticated)?;
        let post = self.load_post(post_id).await?;
        ensure_author(user, &post)?;
        input.validate()?;
        let image = input
            .resolve_image(post.image.clone())
            .map_err(FeedError::Validation)?;

        let group_id = self.resolve_group_id(input.group_slug.as_deref()).await?;
        let updated = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    text: input.text,
                    group_id,
                    image,
                },
            )
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("post {}", post_id)))?;

        info!(post_id, author = %user.username, "Post edited");
        Ok(updated)
    }

    /// Delete a post and its comments. Only the author may delete.
    pub async fn delete_post(&self, requester: &Identity, post_id: i64) -> FeedResult<()> {
        let user = requester.user().ok_or(FeedError::Unauthenticated)?;
        let post = self.load_post(post_id).await?;
        ensure_author(user, &post)?;

        if !self.store.delete_post(post_id).await? {
            return Err(FeedError::NotFound(format!("post {}", post_id)));
        }
        info!(post_id, author = %user.username, "Post deleted");
        Ok(())
    }

    pub async fn post_detail(&self, post_id: i64) -> FeedResult<PostDetail> {
        let post = self.load_post(post_id).await?;
        let comments = self.store.list_comments(post_id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn add_comment(
        &self,
        requester: &Identity,
        post_id: i64,
        input: NewComment,
    ) -> FeedResult<Comment> {
        let author = requester.user().ok_or(FeedError::Unauthenticated)?;
        self.load_post(post_id).await?;
        input.validate()?;
        self.store.upsert_user(author).await?;

        let comment = self
            .store
            .insert_comment(CommentDraft {
                post_id,
                author_id: author.id,
                text: input.text,
                created_at: self.clock.now(),
            })
            .await?;

        info!(post_id, comment_id = comment.id, author = %author.username, "Comment added");
        Ok(comment)
    }

    async fn load_post(&self, post_id: i64) -> FeedResult<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("post {}", post_id)))
    }

    async fn resolve_group_id(&self, slug: Option<&str>) -> FeedResult<Option<Uuid>> {
        let Some(slug) = slug else {
            return Ok(None);
        };
        let group = self
            .store
            .resolve_group(slug)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("group '{}'", slug)))?;
        Ok(Some(group.id))
    }
}

fn ensure_author(user: &UserRef, post: &Post) -> FeedResult<()> {
    if post.author_id != user.id {
        return Err(FeedError::Forbidden(format!(
            "post {} belongs to another author",
            post.id
        )));
    }
    Ok(())
}
