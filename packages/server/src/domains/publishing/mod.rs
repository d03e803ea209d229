//! Publishing: turn a scheduled post into a call to the automation webhook
//! and record the outcome on the post.

pub mod errors;
pub mod payload;
pub mod publisher;
pub mod sweeper;
pub mod webhooks;

pub use errors::{PayloadError, PublishError};
pub use payload::{build_webhook_request, WebhookRequest, CREDENTIAL_FIELD};
pub use publisher::{
    extract_external_post_id, PostPublisher, PublishSettings, PublishSuccess, TimeoutPolicy,
    DEFAULT_WEBHOOK_TIMEOUT, EXTERNAL_ID_FIELDS,
};
pub use sweeper::{list_due_posts, publish_due_posts, SweepFailure, SweepReport};
pub use webhooks::{WebhookEndpoint, WebhookRoutes};
