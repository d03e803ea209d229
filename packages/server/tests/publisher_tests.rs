//! Publication state machine, end to end against the in-memory store and a
//! scripted webhook client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use socials_core::common::{PostId, SocialAccountId, UserId};
use socials_core::domains::auth::User;
use socials_core::domains::posts::{DuePost, Platform, Post, PostStatus, PostType};
use socials_core::domains::publishing::{
    publish_due_posts, PayloadError, PublishError, PublishSettings, TimeoutPolicy,
};
use socials_core::domains::social_accounts::SocialAccount;
use socials_core::kernel::{
    BasePostStore, DeliveryOutcome, InMemoryPostStore, MockWebhookClient, TestDependencies,
};

use crate::common::{scheduled_instagram_image, scheduled_post, social_account, TEST_ACCESS_TOKEN};

// ============================================================================
// Test Helpers
// ============================================================================

/// One Instagram account with one due image post.
fn setup(client: MockWebhookClient) -> (TestDependencies, PostId) {
    let account = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(InMemoryPostStore::new().with_account(account).with_post(post))
        .mock_webhooks(client);

    (deps, post_id)
}

fn stored(deps: &TestDependencies, id: PostId) -> Post {
    deps.store.post(id).expect("post should exist")
}

/// Candidate source whose posts get published by another caller right after
/// they are listed, as a manual publish racing the sweep would.
struct PublishedAfterListing(Arc<InMemoryPostStore>);

#[async_trait]
impl BasePostStore for PublishedAfterListing {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>> {
        self.0.find_post(id).await
    }

    async fn find_social_account(&self, id: SocialAccountId) -> Result<Option<SocialAccount>> {
        self.0.find_social_account(id).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        self.0.find_user(id).await
    }

    async fn find_due_posts(&self, now: DateTime<Utc>) -> Result<Vec<DuePost>> {
        let due = self.0.find_due_posts(now).await?;
        for post in &due {
            self.0.mark_published(post.id, now, Some("manual")).await?;
        }
        Ok(due)
    }

    async fn claim_for_publishing(&self, id: PostId, observed: PostStatus) -> Result<bool> {
        self.0.claim_for_publishing(id, observed).await
    }

    async fn mark_published(
        &self,
        id: PostId,
        published_at: DateTime<Utc>,
        external_post_id: Option<&str>,
    ) -> Result<()> {
        self.0.mark_published(id, published_at, external_post_id).await
    }

    async fn mark_failed(&self, id: PostId, error_message: &str) -> Result<()> {
        self.0.mark_failed(id, error_message).await
    }
}

// ============================================================================
// Sweep scenarios
// ============================================================================

#[tokio::test]
async fn sweep_publishes_due_post_and_records_external_id() {
    let (deps, post_id) = setup(MockWebhookClient::new().with_response(json!({"id": "ext123"})));
    let publisher = deps.publisher();

    let report = publish_due_posts(&publisher, deps.store.as_ref(), Utc::now())
        .await
        .unwrap();

    assert_eq!(report.count, 1);
    assert_eq!(report.published, vec![post_id]);
    assert!(report.failed.is_empty());
    assert_eq!(report.message(), "1 post(s) publié(s), 0 échec(s)");

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.external_post_id.as_deref(), Some("ext123"));
    assert!(post.published_at.is_some());
    assert_eq!(post.error_message, None);

    let call = deps.webhook_client.last_call().unwrap();
    assert_eq!(call.url, "http://n8n.test/webhook/instagram-post-image");
    assert_eq!(
        call.body,
        json!({
            "caption": "Hello",
            "url": "https://x/1.jpg",
            "access_token": TEST_ACCESS_TOKEN
        })
    );
    assert_eq!(call.timeout, Duration::from_millis(120_000));
}

#[tokio::test]
async fn sweep_records_webhook_error_on_post() {
    let (deps, post_id) = setup(MockWebhookClient::new().with_outcome(
        DeliveryOutcome::ApplicationError("Webhook returned 500: boom".to_string()),
    ));
    let publisher = deps.publisher();

    let report = publish_due_posts(&publisher, deps.store.as_ref(), Utc::now())
        .await
        .unwrap();

    assert!(report.published.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].post_id, post_id);
    assert_eq!(report.failed[0].error, "Webhook returned 500: boom");

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Failed);
    assert_eq!(post.error_message.as_deref(), Some("Webhook returned 500: boom"));
    assert_eq!(post.published_at, None);
}

#[tokio::test]
async fn timeout_presumes_success_by_default() {
    let (deps, post_id) = setup(MockWebhookClient::new().with_outcome(DeliveryOutcome::Timeout));
    let publisher = deps.publisher();

    let success = publisher.publish(post_id).await.unwrap();
    assert_eq!(success.external_post_id, None);

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.external_post_id, None);
    assert!(post.published_at.is_some());
    assert_eq!(post.error_message, None);
}

#[tokio::test]
async fn timeout_can_be_treated_as_failure() {
    let (deps, post_id) = setup(MockWebhookClient::new().with_outcome(DeliveryOutcome::Timeout));
    let deps = deps.settings(PublishSettings {
        webhook_timeout: Duration::from_millis(30_000),
        timeout_policy: TimeoutPolicy::TreatAsFailure,
    });

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    let expected = "Timeout: le webhook n8n n'a pas répondu dans les 30 secondes";
    assert!(matches!(&err, PublishError::DeliveryTimeout(m) if m == expected));

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Failed);
    assert_eq!(post.error_message.as_deref(), Some(expected));
    assert_eq!(deps.webhook_client.last_call().unwrap().timeout, Duration::from_millis(30_000));
}

#[tokio::test]
async fn post_without_account_is_left_untouched() {
    let mut post = scheduled_instagram_image(social_account(Platform::Instagram).id);
    post.social_account_id = None;
    let post_id = post.id;

    let deps = TestDependencies::new().mock_store(InMemoryPostStore::new().with_post(post));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(err, PublishError::NoAccountLinked));
    assert_eq!(err.to_string(), "Aucun compte social associé à ce post");
    assert!(err.is_precondition());

    assert_eq!(stored(&deps, post_id).status, PostStatus::Scheduled);
    assert!(deps.store.claim_calls().is_empty());
    assert_eq!(deps.webhook_client.call_count(), 0);
}

#[tokio::test]
async fn unsupported_platform_fails_after_claim() {
    let account = social_account(Platform::Gmb);
    let post = scheduled_post(Platform::Gmb, PostType::Image, account.id);
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(InMemoryPostStore::new().with_account(account).with_post(post));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(err, PublishError::Payload(_)));

    assert_eq!(deps.store.claim_calls(), vec![post_id]);
    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Failed);
    assert_eq!(
        post.error_message.as_deref(),
        Some("Type de post non supporté pour gmb: image")
    );
    assert_eq!(deps.webhook_client.call_count(), 0);
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn unknown_post_is_not_found() {
    let deps = TestDependencies::new();
    let missing = PostId::new();

    let err = deps.publisher().publish(missing).await.unwrap_err();
    assert_eq!(err.to_string(), format!("Post non trouvé: {}", missing));
}

#[tokio::test]
async fn dangling_account_reference_is_reported() {
    let ghost = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(ghost.id);
    let post_id = post.id;

    let deps = TestDependencies::new().mock_store(InMemoryPostStore::new().with_post(post));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(err, PublishError::AccountNotFound(id) if id == ghost.id));
    assert_eq!(stored(&deps, post_id).status, PostStatus::Scheduled);
}

#[tokio::test]
async fn post_already_publishing_is_rejected_without_claim() {
    let account = social_account(Platform::Instagram);
    let mut post = scheduled_instagram_image(account.id);
    post.status = PostStatus::Publishing;
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(InMemoryPostStore::new().with_account(account).with_post(post));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert_eq!(err.to_string(), "Ce post est déjà en cours de publication");
    assert!(deps.store.claim_calls().is_empty());
    assert_eq!(stored(&deps, post_id).status, PostStatus::Publishing);
}

#[tokio::test]
async fn failed_post_can_be_published_again_manually() {
    let account = social_account(Platform::Facebook);
    let mut post = scheduled_post(Platform::Facebook, PostType::Text, account.id);
    post.status = PostStatus::Failed;
    post.error_message = Some("Webhook returned 502: bad gateway".into());
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(InMemoryPostStore::new().with_account(account).with_post(post))
        .mock_webhooks(MockWebhookClient::new().with_response(json!({"post_id": 998877})));

    let success = deps.publisher().publish(post_id).await.unwrap();
    assert_eq!(success.external_post_id.as_deref(), Some("998877"));

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.error_message, None);
    assert_eq!(
        deps.webhook_client.last_call().unwrap().url,
        "http://n8n.test/webhook/facebook-post-texte"
    );
}

#[tokio::test]
async fn blank_token_fails_the_post() {
    let mut account = social_account(Platform::Instagram);
    account.access_token = String::new();
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(InMemoryPostStore::new().with_account(account).with_post(post));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Aucun jeton d'accès configuré pour le compte instagram"
    );
    assert_eq!(stored(&deps, post_id).status, PostStatus::Failed);
    assert_eq!(deps.webhook_client.call_count(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn concurrent_publishes_deliver_exactly_once() {
    let account = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    // Both attempts read the post as `scheduled` before either claims it
    let deps = TestDependencies::new().mock_store(
        InMemoryPostStore::new()
            .with_account(account)
            .with_post(post)
            .with_read_barrier(2),
    );
    let publisher = deps.publisher();

    let (first, second) = tokio::join!(publisher.publish(post_id), publisher.publish(post_id));

    let (won, lost) = match (first, second) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        (a, b) => panic!("expected one winner, got {:?} and {:?}", a, b),
    };

    assert_eq!(won.external_post_id, None);
    assert!(matches!(lost, PublishError::ConcurrentPublishConflict));
    assert_eq!(
        lost.to_string(),
        "Ce post est déjà en cours de publication ou son statut a changé."
    );
    assert_eq!(deps.store.claim_calls().len(), 2);
    assert_eq!(deps.webhook_client.call_count(), 1);
    assert_eq!(stored(&deps, post_id).status, PostStatus::Published);
}

#[tokio::test]
async fn post_is_swept_only_once() {
    let (deps, post_id) = setup(MockWebhookClient::new());
    let publisher = deps.publisher();

    let first = publish_due_posts(&publisher, deps.store.as_ref(), Utc::now())
        .await
        .unwrap();
    let second = publish_due_posts(&publisher, deps.store.as_ref(), Utc::now())
        .await
        .unwrap();

    assert_eq!(first.published, vec![post_id]);
    assert_eq!(second.count, 0);
    assert_eq!(second.message(), "Aucun post à publier");
    assert_eq!(deps.webhook_client.call_count(), 1);
}

#[tokio::test]
async fn post_published_elsewhere_after_listing_is_not_sent_again() {
    let (deps, post_id) = setup(MockWebhookClient::new());
    let publisher = deps.publisher();
    let candidates = PublishedAfterListing(deps.store.clone());

    let report = publish_due_posts(&publisher, &candidates, Utc::now())
        .await
        .unwrap();

    assert_eq!(report.count, 1);
    assert!(report.published.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].error,
        "Ce post est déjà en cours de publication ou son statut a changé."
    );
    assert_eq!(deps.webhook_client.call_count(), 0);

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.external_post_id.as_deref(), Some("manual"));
}

#[tokio::test]
async fn published_post_cannot_be_claimed_with_stale_status() {
    let (deps, post_id) = setup(MockWebhookClient::new());

    deps.publisher().publish(post_id).await.unwrap();

    let claimed = deps
        .store
        .claim_for_publishing(post_id, PostStatus::Scheduled)
        .await
        .unwrap();
    assert!(!claimed);
    assert_eq!(stored(&deps, post_id).status, PostStatus::Published);
}

#[tokio::test]
async fn sweep_continues_past_failures_in_schedule_order() {
    let account = social_account(Platform::Facebook);

    let mut older = scheduled_post(Platform::Facebook, PostType::Image, account.id);
    older.scheduled_at = Some(Utc::now() - chrono::Duration::hours(2));
    let mut orphan = scheduled_post(Platform::Facebook, PostType::Text, account.id);
    orphan.scheduled_at = Some(Utc::now() - chrono::Duration::hours(1));
    orphan.social_account_id = None;
    let newer = scheduled_post(Platform::Facebook, PostType::Video, account.id);
    let mut future = scheduled_post(Platform::Facebook, PostType::Text, account.id);
    future.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));

    let ids = (older.id, orphan.id, newer.id, future.id);

    let deps = TestDependencies::new().mock_store(
        InMemoryPostStore::new()
            .with_account(account)
            .with_post(older)
            .with_post(orphan)
            .with_post(newer)
            .with_post(future),
    );

    let report = publish_due_posts(&deps.publisher(), deps.store.as_ref(), Utc::now())
        .await
        .unwrap();

    assert_eq!(report.count, 3);
    assert_eq!(report.published, vec![ids.0, ids.2]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].post_id, ids.1);
    assert_eq!(report.failed[0].error, "Aucun compte social associé à ce post");
    assert_eq!(stored(&deps, ids.3).status, PostStatus::Scheduled);
}

// ============================================================================
// Store failures
// ============================================================================

#[tokio::test]
async fn store_error_after_delivery_marks_post_failed() {
    let account = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    let deps = TestDependencies::new().mock_store(
        InMemoryPostStore::new()
            .with_account(account)
            .with_post(post)
            .failing_mark_published(),
    );

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(err, PublishError::Store(_)));

    let post = stored(&deps, post_id);
    assert_eq!(post.status, PostStatus::Failed);
    assert_eq!(post.error_message.as_deref(), Some("write conflict on posts"));
}

#[tokio::test]
async fn secondary_store_error_is_swallowed() {
    let account = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    let deps = TestDependencies::new().mock_store(
        InMemoryPostStore::new()
            .with_account(account)
            .with_post(post)
            .failing_mark_published()
            .failing_mark_failed(),
    );

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert_eq!(err.to_string(), "write conflict on posts");

    // Known gap: nothing could be written, the post stays claimed
    assert_eq!(stored(&deps, post_id).status, PostStatus::Publishing);
}

#[tokio::test]
async fn build_error_is_returned_when_failure_cannot_be_recorded() {
    let account = social_account(Platform::Gmb);
    let post = scheduled_post(Platform::Gmb, PostType::Text, account.id);
    let post_id = post.id;

    let deps = TestDependencies::new().mock_store(
        InMemoryPostStore::new()
            .with_account(account)
            .with_post(post)
            .failing_mark_failed(),
    );

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(
        err,
        PublishError::Payload(PayloadError::UnsupportedPostType { .. })
    ));
    assert_eq!(err.to_string(), "Type de post non supporté pour gmb: text");
    assert_eq!(stored(&deps, post_id).status, PostStatus::Publishing);
}

#[tokio::test]
async fn webhook_error_is_returned_when_failure_cannot_be_recorded() {
    let account = social_account(Platform::Instagram);
    let post = scheduled_instagram_image(account.id);
    let post_id = post.id;

    let deps = TestDependencies::new()
        .mock_store(
            InMemoryPostStore::new()
                .with_account(account)
                .with_post(post)
                .failing_mark_failed(),
        )
        .mock_webhooks(MockWebhookClient::new().with_outcome(DeliveryOutcome::ApplicationError(
            "Webhook returned 500: boom".to_string(),
        )));

    let err = deps.publisher().publish(post_id).await.unwrap_err();
    assert!(matches!(err, PublishError::Delivery(_)));
    assert_eq!(err.to_string(), "Webhook returned 500: boom");
    assert_eq!(deps.webhook_client.call_count(), 1);
}

#[tokio::test]
async fn sweep_fails_when_candidates_cannot_be_loaded() {
    let deps = TestDependencies::new().mock_store(InMemoryPostStore::new().failing_due_query());

    let result = publish_due_posts(&deps.publisher(), deps.store.as_ref(), Utc::now()).await;
    assert!(result.is_err());
}
