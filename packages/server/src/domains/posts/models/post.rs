use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::{PostId, SocialAccountId};

// =============================================================================
// Enums
// =============================================================================

/// Social network a post targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "platform_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    /// Google Business Profile
    Gmb,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Gmb => "gmb",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post subtype. Which subtypes are valid depends on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Text,
    Image,
    Carrousel,
    Video,
    Link,
    Reel,
    Story,
    /// Legacy spelling of `Story` still present in older rows
    Stories,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Image => "image",
            PostType::Carrousel => "carrousel",
            PostType::Video => "video",
            PostType::Link => "link",
            PostType::Reel => "reel",
            PostType::Story => "story",
            PostType::Stories => "stories",
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post lifecycle.
///
/// ```text
/// draft ──► pending_validation ──► scheduled ──► publishing ──► published
///   ▲              │    ▲                            │
///   │              ▼    │                            └────────► failed
///   └──────────  rejected ◄──────────────────────────────────────┘
/// ```
///
/// This service only drives `scheduled → publishing → published | failed`;
/// everything else belongs to the validation workflow of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    PendingValidation,
    Scheduled,
    Publishing,
    Published,
    Failed,
    Rejected,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::PendingValidation => "pending_validation",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Publishing => "publishing",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Rejected => "rejected",
        }
    }

    /// Outcome of a publication attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Published | PostStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Entering `publishing` is allowed from any state other than
    /// `publishing` itself, mirroring the conditional claim: a manual publish
    /// may be triggered on a draft or on a failed post.
    pub fn can_transition_to(&self, next: PostStatus) -> bool {
        use PostStatus::*;

        match (self, next) {
            (Publishing, Publishing) => false,
            (_, Publishing) => true,
            (Publishing, Published | Failed) => true,
            (Draft, PendingValidation) => true,
            (PendingValidation, Scheduled | Rejected) => true,
            (Failed, Rejected) => true,
            (Rejected, PendingValidation | Draft) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// One uploaded media attached to a post, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

impl MediaItem {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: MediaType::Image,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: MediaType::Video,
        }
    }
}

/// Instagram user tag; `x`/`y` are normalized (0.0..=1.0) coordinates on the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTag {
    pub username: String,
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// Post
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
pub struct Post {
    #[builder(default)]
    pub id: PostId,
    pub platform: Platform,
    pub post_type: PostType,

    // Content
    #[builder(default, setter(into, strip_option))]
    pub caption: Option<String>,
    #[builder(default, setter(transform = |medias: Vec<MediaItem>| Json(medias)))]
    pub medias: Json<Vec<MediaItem>>,
    #[builder(default, setter(into, strip_option))]
    pub link: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub location_id: Option<String>,
    #[builder(default, setter(transform = |tags: Vec<UserTag>| Some(Json(tags))))]
    pub user_tags: Option<Json<Vec<UserTag>>>,

    // Lifecycle
    #[builder(default)]
    pub status: PostStatus,
    #[builder(default, setter(strip_option))]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub published_at: Option<DateTime<Utc>>,
    #[builder(default, setter(into, strip_option))]
    pub external_post_id: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub social_account_id: Option<SocialAccountId>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// Projection of a due post, used by the sweeper and its dry-run listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DuePost {
    pub id: PostId,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
    pub caption: Option<String>,
    pub platform: Platform,
}

impl From<&Post> for DuePost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            scheduled_at: post.scheduled_at,
            status: post.status,
            caption: post.caption.clone(),
            platform: post.platform,
        }
    }
}

impl Post {
    pub fn first_media(&self) -> Option<&MediaItem> {
        self.medias.first()
    }

    pub fn user_tags(&self) -> &[UserTag] {
        self.user_tags.as_ref().map(|tags| tags.as_slice()).unwrap_or(&[])
    }

    /// Due when scheduled, not yet published, and the scheduled time has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Scheduled
            && self.published_at.is_none()
            && self.scheduled_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Post {
    pub async fn find_by_id(id: PostId, pool: &PgPool) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(post)
    }

    /// Scheduled posts whose time has come, oldest first.
    ///
    /// `published_at IS NULL` keeps a post from ever being picked twice.
    pub async fn find_due(now: DateTime<Utc>, pool: &PgPool) -> Result<Vec<DuePost>> {
        let posts = sqlx::query_as::<_, DuePost>(
            "SELECT id, scheduled_at, status, caption, platform FROM posts
             WHERE status = 'scheduled'
               AND scheduled_at <= $1
               AND published_at IS NULL
             ORDER BY scheduled_at ASC",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;
        Ok(posts)
    }

    /// Atomically move the post into `publishing`.
    ///
    /// Compare-and-swap on the status column: returns `false` when another
    /// writer already holds the post in `publishing`. This is the only
    /// cross-process lock for publication.
    /// Compare-and-swap from the status the caller observed to `publishing`.
    pub async fn claim_for_publishing(
        id: PostId,
        observed: PostStatus,
        pool: &PgPool,
    ) -> Result<bool> {
        let claimed = sqlx::query_scalar::<_, PostId>(
            "UPDATE posts
             SET status = 'publishing', updated_at = NOW()
             WHERE id = $1 AND status = $2 AND status <> 'publishing'
             RETURNING id",
        )
        .bind(id)
        .bind(observed)
        .fetch_optional(pool)
        .await?;
        Ok(claimed.is_some())
    }

    pub async fn mark_published(
        id: PostId,
        published_at: DateTime<Utc>,
        external_post_id: Option<&str>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE posts
             SET status = 'published',
                 published_at = $2,
                 external_post_id = $3,
                 error_message = NULL,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(published_at)
        .bind(external_post_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(id: PostId, error_message: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE posts
             SET status = 'failed',
                 error_message = $2,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert a post as-is. Posts are authored by the dashboard; this is used
    /// by fixtures and data repair scripts.
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (
                id, platform, post_type, caption, medias, link, location_id, user_tags,
                status, scheduled_at, published_at, external_post_id, error_message,
                social_account_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.platform)
        .bind(self.post_type)
        .bind(&self.caption)
        .bind(&self.medias)
        .bind(&self.link)
        .bind(&self.location_id)
        .bind(&self.user_tags)
        .bind(self.status)
        .bind(self.scheduled_at)
        .bind(self.published_at)
        .bind(&self.external_post_id)
        .bind(&self.error_message)
        .bind(self.social_account_id)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;
        Ok(post)
    }
}
