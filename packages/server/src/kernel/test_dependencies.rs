// TestDependencies - in-memory implementations for testing
//
// Provides a record store and a scripted webhook client that can be injected
// into ServerDeps / PostPublisher without Postgres or a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Barrier;

use super::{BasePostStore, BaseWebhookClient, DeliveryOutcome, ServerDeps};
use crate::common::{PostId, SocialAccountId, UserId};
use crate::domains::auth::User;
use crate::domains::posts::{DuePost, Post, PostStatus};
use crate::domains::publishing::{PostPublisher, PublishSettings, WebhookRoutes};
use crate::domains::social_accounts::SocialAccount;

// =============================================================================
// In-memory post store
// =============================================================================

/// Record store backed by a mutex.
///
/// The claim is done under the lock, which gives the same compare-and-swap
/// guarantee as the conditional UPDATE in Postgres.
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<HashMap<PostId, Post>>,
    accounts: Mutex<HashMap<SocialAccountId, SocialAccount>>,
    users: Mutex<HashMap<UserId, User>>,
    /// Parks every `find_post` until this many readers have arrived
    read_barrier: Option<Arc<Barrier>>,
    claim_calls: Mutex<Vec<PostId>>,
    fail_mark_published: AtomicBool,
    fail_mark_failed: AtomicBool,
    fail_due_query: AtomicBool,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(self, post: Post) -> Self {
        self.insert_post(post);
        self
    }

    pub fn with_account(self, account: SocialAccount) -> Self {
        self.accounts.lock().unwrap().insert(account.id, account);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().insert(user.id, user);
        self
    }

    /// Make `readers` concurrent publishes all observe the post before any
    /// of them gets to claim it.
    pub fn with_read_barrier(mut self, readers: usize) -> Self {
        self.read_barrier = Some(Arc::new(Barrier::new(readers)));
        self
    }

    pub fn failing_mark_published(self) -> Self {
        self.fail_mark_published.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_mark_failed(self) -> Self {
        self.fail_mark_failed.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_due_query(self) -> Self {
        self.fail_due_query.store(true, Ordering::SeqCst);
        self
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id, post);
    }

    /// Current state of a post
    pub fn post(&self, id: PostId) -> Option<Post> {
        self.posts.lock().unwrap().get(&id).cloned()
    }

    pub fn claim_calls(&self) -> Vec<PostId> {
        self.claim_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BasePostStore for InMemoryPostStore {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>> {
        let post = self.posts.lock().unwrap().get(&id).cloned();
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(post)
    }

    async fn find_social_account(&self, id: SocialAccountId) -> Result<Option<SocialAccount>> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_due_posts(&self, now: DateTime<Utc>) -> Result<Vec<DuePost>> {
        if self.fail_due_query.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }

        let posts = self.posts.lock().unwrap();
        let mut due: Vec<DuePost> = posts
            .values()
            .filter(|post| post.is_due(now))
            .map(DuePost::from)
            .collect();
        due.sort_by_key(|post| post.scheduled_at);
        Ok(due)
    }

    async fn claim_for_publishing(&self, id: PostId, observed: PostStatus) -> Result<bool> {
        self.claim_calls.lock().unwrap().push(id);

        let mut posts = self.posts.lock().unwrap();
        match posts.get_mut(&id) {
            Some(post) if post.status == observed && observed != PostStatus::Publishing => {
                post.status = PostStatus::Publishing;
                post.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_published(
        &self,
        id: PostId,
        published_at: DateTime<Utc>,
        external_post_id: Option<&str>,
    ) -> Result<()> {
        if self.fail_mark_published.load(Ordering::SeqCst) {
            return Err(anyhow!("write conflict on posts"));
        }

        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or_else(|| anyhow!("post {} vanished", id))?;
        post.status = PostStatus::Published;
        post.published_at = Some(published_at);
        post.external_post_id = external_post_id.map(str::to_string);
        post.error_message = None;
        post.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(&self, id: PostId, error_message: &str) -> Result<()> {
        if self.fail_mark_failed.load(Ordering::SeqCst) {
            return Err(anyhow!("database is read-only"));
        }

        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or_else(|| anyhow!("post {} vanished", id))?;
        post.status = PostStatus::Failed;
        post.error_message = Some(error_message.to_string());
        post.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Mock webhook client
// =============================================================================

/// Arguments captured from a deliver call
#[derive(Debug, Clone)]
pub struct WebhookCall {
    pub url: String,
    pub body: Value,
    pub timeout: Duration,
}

/// Replays queued outcomes in order; answers `Delivered({})` once the queue is empty.
#[derive(Default)]
pub struct MockWebhookClient {
    outcomes: Mutex<Vec<DeliveryOutcome>>,
    calls: Mutex<Vec<WebhookCall>>,
}

impl MockWebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(self, outcome: DeliveryOutcome) -> Self {
        self.outcomes.lock().unwrap().push(outcome);
        self
    }

    pub fn with_response(self, data: Value) -> Self {
        self.with_outcome(DeliveryOutcome::Delivered(data))
    }

    pub fn calls(&self) -> Vec<WebhookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<WebhookCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BaseWebhookClient for MockWebhookClient {
    async fn deliver(&self, url: &str, body: &Value, timeout: Duration) -> DeliveryOutcome {
        self.calls.lock().unwrap().push(WebhookCall {
            url: url.to_string(),
            body: body.clone(),
            timeout,
        });

        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            DeliveryOutcome::Delivered(Value::Object(Default::default()))
        } else {
            outcomes.remove(0)
        }
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<InMemoryPostStore>,
    pub webhook_client: Arc<MockWebhookClient>,
    pub routes: WebhookRoutes,
    pub settings: PublishSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryPostStore::new()),
            webhook_client: Arc::new(MockWebhookClient::new()),
            routes: WebhookRoutes::from_base_url("http://n8n.test/webhook"),
            settings: PublishSettings::default(),
        }
    }

    pub fn mock_store(mut self, store: InMemoryPostStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn mock_webhooks(mut self, client: MockWebhookClient) -> Self {
        self.webhook_client = Arc::new(client);
        self
    }

    pub fn settings(mut self, settings: PublishSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn publisher(&self) -> PostPublisher {
        self.server_deps()
            .publisher(self.routes.clone(), self.settings)
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.store.clone(), self.webhook_client.clone())
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
