// Main entry point for the publishing service

use std::sync::Arc;

use anyhow::{Context, Result};
use socials_core::domains::auth::JwtService;
use socials_core::kernel::{scheduled_tasks, ServerDeps};
use socials_core::server::{build_app, AppState};
use socials_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,socials_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sophia Socials publishing service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        webhook_timeout_ms = config.webhook_timeout.as_millis() as u64,
        timeout_policy = ?config.timeout_policy,
        "Configuration loaded"
    );

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let deps = Arc::new(ServerDeps::production(pool));
    let publisher = Arc::new(deps.publisher(config.webhook_routes(), config.publish_settings()));

    if config.scheduler_api_key.is_none() {
        tracing::warn!("SCHEDULER_API_KEY not set, /api/posts/check-scheduled will refuse calls");
    }

    // Optional in-process sweep; keep the handle alive for the server's lifetime
    let _scheduler = match &config.publish_sweep_cron {
        Some(cron) => Some(
            scheduled_tasks::start_scheduler(cron, publisher.clone(), deps.store.clone())
                .await
                .context("Failed to start publish sweep scheduler")?,
        ),
        None => None,
    };

    let state = AppState {
        deps,
        publisher,
        jwt_service: Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())),
        scheduler_api_key: config.scheduler_api_key.clone(),
    };
    let app = build_app(state, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
