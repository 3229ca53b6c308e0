use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Reference to a registered user, as resolved by the identity layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

/// Who is making a request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(UserRef),
}

impl Identity {
    pub fn user(&self) -> Option<&UserRef> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

impl From<UserRef> for Identity {
    fn from(user: UserRef) -> Self {
        Identity::User(user)
    }
}

/// Post entity. Feed order is `created_at` descending with `id` descending as tiebreak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Topical community that posts can belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Directed subscription from follower to followee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Post authoring input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewPost {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    pub group_slug: Option<String>,
    pub image: Option<String>,
}

/// New values for a post's editable fields.
///
/// Text and group are replaced. The image is kept when `image` is `None`,
/// replaced when it is set, and removed when `clear_image` is set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    pub group_slug: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub clear_image: bool,
}

impl PostUpdate {
    /// Image the post should carry after the update
    pub fn resolve_image(&self, current: Option<String>) -> Result<Option<String>, String> {
        match (&self.image, self.clear_image) {
            (Some(_), true) => Err("submit a new image or clear it, not both".to_string()),
            (Some(image), false) => Ok(Some(image.clone())),
            (None, true) => Ok(None),
            (None, false) => Ok(current),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewComment {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
}

/// Row to persist, produced after validation and slug resolution
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of an existing post. The author is not editable.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub post_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Post together with its comments, oldest comment first
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("text must not be empty".into());
        return Err(error);
    }
    Ok(())
}
