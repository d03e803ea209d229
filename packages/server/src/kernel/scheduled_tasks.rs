//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Optional in-process trigger for the due-post sweep. The HTTP route
//! `POST /api/posts/check-scheduled` stays the primary trigger; both go
//! through the same claim so running them side by side is safe.
//!
//! ```text
//! Scheduler (PUBLISH_SWEEP_CRON)
//!     │
//!     └─► publish_due_posts(now)
//!             └─► For each due post → PostPublisher::publish
//! ```

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::publishing::{publish_due_posts, PostPublisher};
use crate::kernel::BasePostStore;

/// Start the publish sweep on `cron` (six fields, seconds first).
pub async fn start_scheduler(
    cron: &str,
    publisher: Arc<PostPublisher>,
    store: Arc<dyn BasePostStore>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_job = Job::new_async(cron, move |_uuid, _lock| {
        let publisher = publisher.clone();
        let store = store.clone();
        Box::pin(async move {
            if let Err(e) = run_publish_sweep(&publisher, store.as_ref()).await {
                tracing::error!("Publish sweep task failed: {}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!(cron = %cron, "Scheduled tasks started (publish sweep)");
    Ok(scheduler)
}

async fn run_publish_sweep(publisher: &PostPublisher, store: &dyn BasePostStore) -> Result<()> {
    tracing::info!("Running publish sweep task");

    let report = publish_due_posts(publisher, store, Utc::now()).await?;

    tracing::info!(
        count = report.count,
        published = report.published.len(),
        failed = report.failed.len(),
        "{}",
        report.message()
    );
    Ok(())
}
