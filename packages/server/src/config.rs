use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::domains::publishing::{
    PublishSettings, TimeoutPolicy, WebhookRoutes, DEFAULT_WEBHOOK_TIMEOUT,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Shared secret of the external scheduler. Unset means the sweep route
    /// answers "Configuration manquante".
    pub scheduler_api_key: Option<String>,
    pub n8n_webhook_base_url: String,
    pub webhook_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
    /// Six-field cron for the in-process sweep; unset disables it
    pub publish_sweep_cron: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "sophia-socials".to_string()),
            scheduler_api_key: non_empty(env::var("SCHEDULER_API_KEY").ok()),
            n8n_webhook_base_url: env::var("N8N_WEBHOOK_BASE_URL")
                .context("N8N_WEBHOOK_BASE_URL must be set")?,
            webhook_timeout: parse_webhook_timeout(env::var("N8N_WEBHOOK_TIMEOUT_MS").ok().as_deref()),
            timeout_policy: parse_timeout_policy(
                env::var("PUBLISH_TIMEOUT_AS_SUCCESS").ok().as_deref(),
            ),
            publish_sweep_cron: non_empty(env::var("PUBLISH_SWEEP_CRON").ok()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_allowed_origins(&origins))
                .unwrap_or_default(),
        })
    }

    pub fn webhook_routes(&self) -> WebhookRoutes {
        WebhookRoutes::from_base_url(&self.n8n_webhook_base_url)
    }

    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            webhook_timeout: self.webhook_timeout,
            timeout_policy: self.timeout_policy,
        }
    }
}

/// Milliseconds; anything unparsable or not strictly positive falls back to the default.
pub fn parse_webhook_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| Duration::from_millis(ms.ceil() as u64))
        .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT)
}

/// Only an explicit `false`/`0`/`no` turns timeouts into failures.
pub fn parse_timeout_policy(raw: Option<&str>) -> TimeoutPolicy {
    let presume_success = !matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("false" | "0" | "no" | "off")
    );
    TimeoutPolicy::from_presume_success(presume_success)
}

pub fn parse_allowed_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
