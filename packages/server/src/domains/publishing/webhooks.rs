use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Automation workflows exposed by n8n, one per platform/subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookEndpoint {
    InstagramPostImage,
    InstagramPostCarrousel,
    InstagramPostStories,
    InstagramPostReels,
    FacebookPostTexte,
    FacebookPostImage,
    FacebookPostVideo,
    FacebookPostCarrousel,
    FacebookPostLinkpreview,
}

impl WebhookEndpoint {
    pub const ALL: [WebhookEndpoint; 9] = [
        WebhookEndpoint::InstagramPostImage,
        WebhookEndpoint::InstagramPostCarrousel,
        WebhookEndpoint::InstagramPostStories,
        WebhookEndpoint::InstagramPostReels,
        WebhookEndpoint::FacebookPostTexte,
        WebhookEndpoint::FacebookPostImage,
        WebhookEndpoint::FacebookPostVideo,
        WebhookEndpoint::FacebookPostCarrousel,
        WebhookEndpoint::FacebookPostLinkpreview,
    ];

    /// Path segment of the workflow under the webhook base URL.
    pub fn slug(&self) -> &'static str {
        match self {
            WebhookEndpoint::InstagramPostImage => "instagram-post-image",
            WebhookEndpoint::InstagramPostCarrousel => "instagram-post-carrousel",
            WebhookEndpoint::InstagramPostStories => "instagram-post-stories",
            WebhookEndpoint::InstagramPostReels => "instagram-post-reels",
            WebhookEndpoint::FacebookPostTexte => "facebook-post-texte",
            WebhookEndpoint::FacebookPostImage => "facebook-post-image",
            WebhookEndpoint::FacebookPostVideo => "facebook-post-video",
            WebhookEndpoint::FacebookPostCarrousel => "facebook-post-carrousel",
            WebhookEndpoint::FacebookPostLinkpreview => "facebook-post-linkpreview",
        }
    }
}

impl std::fmt::Display for WebhookEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Endpoint → URL table handed to the publisher at construction.
#[derive(Debug, Clone, Default)]
pub struct WebhookRoutes {
    urls: HashMap<WebhookEndpoint, String>,
}

impl WebhookRoutes {
    /// Every endpoint at `{base_url}/{slug}`.
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let urls = WebhookEndpoint::ALL
            .iter()
            .map(|endpoint| (*endpoint, format!("{}/{}", base, endpoint.slug())))
            .collect();
        Self { urls }
    }

    /// Point one endpoint somewhere else (e.g. a test workflow).
    pub fn with_url(mut self, endpoint: WebhookEndpoint, url: impl Into<String>) -> Self {
        self.urls.insert(endpoint, url.into());
        self
    }

    pub fn without(mut self, endpoint: WebhookEndpoint) -> Self {
        self.urls.remove(&endpoint);
        self
    }

    pub fn url_for(&self, endpoint: WebhookEndpoint) -> Option<&str> {
        self.urls.get(&endpoint).map(String::as_str)
    }
}
