//! Postgres implementation of [`BasePostStore`](super::BasePostStore).
//!
//! Thin adapter: the SQL lives on the models.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::BasePostStore;
use crate::common::{PostId, SocialAccountId, UserId};
use crate::domains::auth::User;
use crate::domains::posts::{DuePost, Post, PostStatus};
use crate::domains::social_accounts::SocialAccount;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresPostStore {
    pool: PgPool,
}

impl PostgresPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BasePostStore for PostgresPostStore {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>> {
        Post::find_by_id(id, &self.pool)
            .await
            .with_context(|| format!("Failed to load post {}", id))
    }

    async fn find_social_account(&self, id: SocialAccountId) -> Result<Option<SocialAccount>> {
        SocialAccount::find_by_id(id, &self.pool)
            .await
            .with_context(|| format!("Failed to load social account {}", id))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        User::find_by_id(id, &self.pool).await
    }

    async fn find_due_posts(&self, now: DateTime<Utc>) -> Result<Vec<DuePost>> {
        Post::find_due(now, &self.pool).await
    }

    async fn claim_for_publishing(&self, id: PostId, observed: PostStatus) -> Result<bool> {
        Post::claim_for_publishing(id, observed, &self.pool).await
    }

    async fn mark_published(
        &self,
        id: PostId,
        published_at: DateTime<Utc>,
        external_post_id: Option<&str>,
    ) -> Result<()> {
        Post::mark_published(id, published_at, external_post_id, &self.pool).await
    }

    async fn mark_failed(&self, id: PostId, error_message: &str) -> Result<()> {
        Post::mark_failed(id, error_message, &self.pool).await
    }

    async fn health_check(&self) -> Result<()> {
        tokio::time::timeout(
            HEALTH_CHECK_TIMEOUT,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await
        .context("Database health check timed out")??;
        Ok(())
    }
}
