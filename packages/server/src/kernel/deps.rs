//! Server dependencies (using traits for testability)
//!
//! Central container for the infrastructure the publishing domain talks to.
//! Production wires Postgres + reqwest; tests wire `TestDependencies`.

use std::sync::Arc;

use sqlx::PgPool;

use super::{BasePostStore, BaseWebhookClient, N8nWebhookClient, PostgresPostStore};
use crate::domains::publishing::{PostPublisher, PublishSettings, WebhookRoutes};

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BasePostStore>,
    pub webhook_client: Arc<dyn BaseWebhookClient>,
}

impl ServerDeps {
    pub fn new(store: Arc<dyn BasePostStore>, webhook_client: Arc<dyn BaseWebhookClient>) -> Self {
        Self {
            store,
            webhook_client,
        }
    }

    pub fn production(db_pool: PgPool) -> Self {
        Self::new(
            Arc::new(PostgresPostStore::new(db_pool)),
            Arc::new(N8nWebhookClient::new()),
        )
    }

    pub fn publisher(&self, routes: WebhookRoutes, settings: PublishSettings) -> PostPublisher {
        PostPublisher::new(
            self.store.clone(),
            self.webhook_client.clone(),
            routes,
            settings,
        )
    }
}
