use chrono::{DateTime, Utc};
use serde::Serialize;

use super::publisher::PostPublisher;
use crate::common::PostId;
use crate::domains::posts::DuePost;
use crate::kernel::BasePostStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub post_id: PostId,
    pub error: String,
}

/// Result of one pass over the due posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub count: usize,
    pub published: Vec<PostId>,
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn message(&self) -> String {
        if self.count == 0 {
            return "Aucun post à publier".to_string();
        }
        format!(
            "{} post(s) publié(s), {} échec(s)",
            self.published.len(),
            self.failed.len()
        )
    }
}

/// Publish every post due at `now`, one after the other.
///
/// A failing post is reported and the sweep moves on. Only the candidate
/// query itself can fail the sweep.
pub async fn publish_due_posts(
    publisher: &PostPublisher,
    store: &dyn BasePostStore,
    now: DateTime<Utc>,
) -> anyhow::Result<SweepReport> {
    let due = store.find_due_posts(now).await?;

    let mut report = SweepReport {
        count: due.len(),
        ..Default::default()
    };

    if due.is_empty() {
        tracing::debug!("No post due for publication");
        return Ok(report);
    }

    tracing::info!(count = due.len(), "Publishing due posts");

    for post in due {
        match publisher.publish_due(&post).await {
            Ok(_) => report.published.push(post.id),
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "Scheduled publication failed");
                report.failed.push(SweepFailure {
                    post_id: post.id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        published = report.published.len(),
        failed = report.failed.len(),
        "Sweep finished"
    );

    Ok(report)
}

/// Dry run: what [`publish_due_posts`] would pick up at `now`.
pub async fn list_due_posts(
    store: &dyn BasePostStore,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<DuePost>> {
    store.find_due_posts(now).await
}
