//! reqwest-backed delivery to the n8n automation webhooks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{BaseWebhookClient, DeliveryOutcome};

#[derive(Debug, Clone, Default)]
pub struct N8nWebhookClient {
    client: reqwest::Client,
}

impl N8nWebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BaseWebhookClient for N8nWebhookClient {
    async fn deliver(&self, url: &str, body: &Value, timeout: Duration) -> DeliveryOutcome {
        tracing::debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "Calling webhook");

        let response = match self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return DeliveryOutcome::Timeout,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Webhook transport error");
                return DeliveryOutcome::ApplicationError(e.to_string());
            }
        };

        let status = response.status();

        // The deadline covers the body too
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return DeliveryOutcome::Timeout,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read webhook response body");
                String::new()
            }
        };

        if !status.is_success() {
            return DeliveryOutcome::ApplicationError(format!(
                "Webhook returned {}: {}",
                status.as_u16(),
                text
            ));
        }

        let data = serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default()));
        DeliveryOutcome::Delivered(data)
    }
}
