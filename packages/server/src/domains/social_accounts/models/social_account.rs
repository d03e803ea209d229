use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::SocialAccountId;
use crate::domains::posts::Platform;

/// Credentials of a page / business account the organization posts as.
///
/// `access_token` is a long-lived platform secret. It is forwarded to the
/// automation webhooks and must never be logged, hence the manual `Debug`.
#[derive(Clone, sqlx::FromRow, TypedBuilder)]
pub struct SocialAccount {
    #[builder(default)]
    pub id: SocialAccountId,
    pub platform: Platform,
    /// Page id, Instagram business id or GMB location id on the platform side
    #[builder(setter(into))]
    pub account_id: String,
    #[builder(setter(into))]
    pub account_name: String,
    #[builder(setter(into))]
    pub access_token: String,
    #[builder(default, setter(strip_option))]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for SocialAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialAccount")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("account_id", &self.account_id)
            .field("account_name", &self.account_name)
            .field("access_token", &"[redacted]")
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}

impl SocialAccount {
    /// The access token, if one is actually configured.
    pub fn credential(&self) -> Option<&str> {
        let token = self.access_token.trim();
        (!token.is_empty()).then_some(token)
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl SocialAccount {
    pub async fn find_by_id(id: SocialAccountId, pool: &PgPool) -> Result<Option<Self>> {
        let account =
            sqlx::query_as::<_, SocialAccount>("SELECT * FROM social_accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(account)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let account = sqlx::query_as::<_, SocialAccount>(
            r#"
            INSERT INTO social_accounts (
                id, platform, account_id, account_name, access_token, token_expires_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.platform)
        .bind(&self.account_id)
        .bind(&self.account_name)
        .bind(&self.access_token)
        .bind(self.token_expires_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;
        Ok(account)
    }
}
