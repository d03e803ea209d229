//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod post_store;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;
pub mod webhook_client;

pub use deps::ServerDeps;
pub use post_store::PostgresPostStore;
pub use test_dependencies::{InMemoryPostStore, MockWebhookClient, TestDependencies, WebhookCall};
pub use traits::*;
pub use webhook_client::N8nWebhookClient;
