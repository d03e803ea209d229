//! Test fixtures for creating test data.
//!
//! Builders return plain values usable with the in-memory store; the
//! `insert_*` helpers write them through the model methods.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{Duration, Utc};
use socials_core::common::{SocialAccountId, UserId, UserRole};
use socials_core::domains::auth::User;
use socials_core::domains::posts::{MediaItem, Platform, Post, PostStatus, PostType};
use socials_core::domains::social_accounts::SocialAccount;
use sqlx::PgPool;

pub const TEST_ACCESS_TOKEN: &str = "EAAB-test-token";

pub fn social_account(platform: Platform) -> SocialAccount {
    SocialAccount::builder()
        .platform(platform)
        .account_id(format!("{}-page-1", platform))
        .account_name("Sophia Immobilier")
        .access_token(TEST_ACCESS_TOKEN)
        .build()
}

/// Instagram image post, scheduled five minutes ago.
pub fn scheduled_instagram_image(account_id: SocialAccountId) -> Post {
    scheduled_post(Platform::Instagram, PostType::Image, account_id)
}

pub fn scheduled_post(
    platform: Platform,
    post_type: PostType,
    account_id: SocialAccountId,
) -> Post {
    Post::builder()
        .platform(platform)
        .post_type(post_type)
        .caption("Hello")
        .medias(vec![MediaItem::image("https://x/1.jpg")])
        .status(PostStatus::Scheduled)
        .scheduled_at(Utc::now() - Duration::minutes(5))
        .social_account_id(account_id)
        .build()
}

pub fn user_with_role(role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: UserId::new(),
        email: format!("{}@sophia.test", role),
        full_name: format!("Test {}", role),
        role,
        created_at: now,
        updated_at: now,
    }
}

pub async fn insert_user(pool: &PgPool, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (id, email, full_name, role, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Account + scheduled post linked to it, both persisted.
pub async fn insert_scheduled_post(
    pool: &PgPool,
    platform: Platform,
    post_type: PostType,
) -> Result<(SocialAccount, Post)> {
    let account = social_account(platform).insert(pool).await?;
    let post = scheduled_post(platform, post_type, account.id)
        .insert(pool)
        .await?;
    Ok((account, post))
}
