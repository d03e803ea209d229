//! Publication of a single post.
//!
//! ```text
//! load post ─► load account ─► claim (scheduled|… → publishing)
//!                                   │
//!                                   ▼
//!                        build payload ─► deliver ─► published | failed
//! ```
//!
//! The claim is a conditional update in the store; it is the only lock.
//! Anything that goes wrong after the claim leaves the post `failed`, never
//! `publishing`, unless the store rejects that write too or the process
//! crashes mid-flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use super::errors::PublishError;
use super::payload::build_webhook_request;
use super::webhooks::WebhookRoutes;
use crate::common::PostId;
use crate::domains::posts::{DuePost, Post, PostStatus};
use crate::domains::social_accounts::SocialAccount;
use crate::kernel::{BasePostStore, BaseWebhookClient, DeliveryOutcome};

/// Response fields that may carry the platform-side post id, in lookup order.
///
/// This is the contract with the automation workflows: the first non-empty
/// one wins.
pub const EXTERNAL_ID_FIELDS: [&str; 3] = ["id", "post_id", "external_id"];

pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_millis(120_000);

/// How to interpret a webhook that did not answer in time.
///
/// The automations usually finish the platform call even when we stop
/// waiting, so a timeout most often means the post went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Record the post as published, without external id.
    #[default]
    PresumeSuccess,
    /// Record the post as failed with a timeout message.
    TreatAsFailure,
}

impl TimeoutPolicy {
    pub fn from_presume_success(presume_success: bool) -> Self {
        if presume_success {
            TimeoutPolicy::PresumeSuccess
        } else {
            TimeoutPolicy::TreatAsFailure
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PublishSettings {
    pub webhook_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSuccess {
    pub external_post_id: Option<String>,
}

pub struct PostPublisher {
    store: Arc<dyn BasePostStore>,
    client: Arc<dyn BaseWebhookClient>,
    routes: WebhookRoutes,
    settings: PublishSettings,
}

impl PostPublisher {
    pub fn new(
        store: Arc<dyn BasePostStore>,
        client: Arc<dyn BaseWebhookClient>,
        routes: WebhookRoutes,
        settings: PublishSettings,
    ) -> Self {
        Self {
            store,
            client,
            routes,
            settings,
        }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Manual publication: claims against whatever status the post has now.
    pub async fn publish(&self, post_id: PostId) -> Result<PublishSuccess, PublishError> {
        self.publish_observed(post_id, None).await
    }

    /// Publication of a sweep candidate. The claim only succeeds if the post
    /// still has the status it was listed with.
    pub async fn publish_due(&self, due: &DuePost) -> Result<PublishSuccess, PublishError> {
        self.publish_observed(due.id, Some(due.status)).await
    }

    async fn publish_observed(
        &self,
        post_id: PostId,
        observed: Option<PostStatus>,
    ) -> Result<PublishSuccess, PublishError> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| PublishError::post_not_found(post_id))?;

        let account_id = post
            .social_account_id
            .ok_or(PublishError::NoAccountLinked)?;
        let account = self
            .store
            .find_social_account(account_id)
            .await?
            .ok_or(PublishError::AccountNotFound(account_id))?;

        if post.status == PostStatus::Publishing {
            return Err(PublishError::AlreadyPublishing);
        }

        let expected = observed.unwrap_or(post.status);
        if !self.store.claim_for_publishing(post_id, expected).await? {
            tracing::info!(post_id = %post_id, "Lost publish claim to a concurrent attempt");
            return Err(PublishError::ConcurrentPublishConflict);
        }

        tracing::info!(
            post_id = %post_id,
            platform = %post.platform,
            post_type = %post.post_type,
            "Publishing post"
        );

        match self.deliver_and_record(&post, &account).await {
            Ok(success) => Ok(success),
            Err(PublishError::Store(e)) => {
                tracing::error!(post_id = %post_id, error = %e, "Store error while publishing");
                self.mark_failed_best_effort(post_id, &e.to_string()).await;
                Err(PublishError::Store(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Everything after the claim. Build and delivery failures are recorded
    /// here and keep their own message even if that write fails; only a
    /// failed `published` write surfaces as a store error.
    async fn deliver_and_record(
        &self,
        post: &Post,
        account: &SocialAccount,
    ) -> Result<PublishSuccess, PublishError> {
        let now = Utc::now();
        if account.is_token_expired(now) {
            tracing::warn!(
                post_id = %post.id,
                social_account_id = %account.id,
                "Access token is past its expiry date, publishing anyway"
            );
        }

        let request = match build_webhook_request(post, account, &self.routes) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "Cannot build webhook payload");
                self.mark_failed_best_effort(post.id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        let outcome = self
            .client
            .deliver(
                &request.url,
                &request.body_value(),
                self.settings.webhook_timeout,
            )
            .await;

        match outcome {
            DeliveryOutcome::Delivered(data) => {
                let external_post_id = extract_external_post_id(&data);
                self.store
                    .mark_published(post.id, Utc::now(), external_post_id.as_deref())
                    .await?;
                tracing::info!(
                    post_id = %post.id,
                    endpoint = %request.endpoint,
                    external_post_id = external_post_id.as_deref().unwrap_or(""),
                    "Post published"
                );
                Ok(PublishSuccess { external_post_id })
            }
            DeliveryOutcome::ApplicationError(message) => {
                tracing::warn!(post_id = %post.id, endpoint = %request.endpoint, error = %message, "Webhook failed");
                self.mark_failed_best_effort(post.id, &message).await;
                Err(PublishError::Delivery(message))
            }
            DeliveryOutcome::Timeout => match self.settings.timeout_policy {
                TimeoutPolicy::PresumeSuccess => {
                    tracing::warn!(
                        post_id = %post.id,
                        endpoint = %request.endpoint,
                        "Webhook timed out, presuming the post went out"
                    );
                    self.store.mark_published(post.id, Utc::now(), None).await?;
                    Ok(PublishSuccess {
                        external_post_id: None,
                    })
                }
                TimeoutPolicy::TreatAsFailure => {
                    let message = timeout_message(self.settings.webhook_timeout);
                    tracing::warn!(post_id = %post.id, endpoint = %request.endpoint, "{}", message);
                    self.mark_failed_best_effort(post.id, &message).await;
                    Err(PublishError::DeliveryTimeout(message))
                }
            },
        }
    }

    async fn mark_failed_best_effort(&self, post_id: PostId, error_message: &str) {
        if let Err(e) = self.store.mark_failed(post_id, error_message).await {
            tracing::error!(
                post_id = %post_id,
                error = %e,
                "Could not record publish failure, post may stay in publishing"
            );
        }
    }
}

/// First non-empty id among [`EXTERNAL_ID_FIELDS`]; numbers are rendered as text.
pub fn extract_external_post_id(data: &Value) -> Option<String> {
    EXTERNAL_ID_FIELDS.iter().find_map(|field| match data.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn timeout_message(timeout: Duration) -> String {
    let seconds = timeout.as_millis().div_ceil(1000);
    format!(
        "Timeout: le webhook n8n n'a pas répondu dans les {} secondes",
        seconds
    )
}
