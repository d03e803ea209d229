// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Publication rules live in domains/publishing and are written against these.
//
// Naming convention: Base* for trait names (e.g., BasePostStore, BaseWebhookClient)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::common::{PostId, SocialAccountId, UserId};
use crate::domains::auth::User;
use crate::domains::posts::{DuePost, Post, PostStatus};
use crate::domains::social_accounts::SocialAccount;

// =============================================================================
// Record store
// =============================================================================

#[async_trait]
pub trait BasePostStore: Send + Sync {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>>;

    async fn find_social_account(&self, id: SocialAccountId) -> Result<Option<SocialAccount>>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// `scheduled`, due at or before `now`, never published; oldest first.
    async fn find_due_posts(&self, now: DateTime<Utc>) -> Result<Vec<DuePost>>;

    /// Moves the post to `publishing` only if its status is still `observed`.
    /// `Ok(false)` means another writer got there first.
    async fn claim_for_publishing(&self, id: PostId, observed: PostStatus) -> Result<bool>;

    async fn mark_published(
        &self,
        id: PostId,
        published_at: DateTime<Utc>,
        external_post_id: Option<&str>,
    ) -> Result<()>;

    async fn mark_failed(&self, id: PostId, error_message: &str) -> Result<()>;

    /// Liveness probe used by the health route
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Webhook delivery
// =============================================================================

/// What came back from one webhook call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// 2xx; body parsed as JSON, `{}` when empty or not JSON
    Delivered(Value),
    /// Non-2xx answer or transport failure
    ApplicationError(String),
    /// No answer within the deadline. The remote side may still have published.
    Timeout,
}

#[async_trait]
pub trait BaseWebhookClient: Send + Sync {
    /// Exactly one POST of `body` to `url`, bounded by `timeout`. Never retries.
    async fn deliver(&self, url: &str, body: &Value, timeout: Duration) -> DeliveryOutcome;
}
