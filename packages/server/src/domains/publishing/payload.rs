//! Post + account → webhook request.
//!
//! Pure mapping, no I/O. Each platform/subtype pair maps to one automation
//! workflow with its own body shape; optional fields are left out of the body
//! rather than sent as `null`.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::errors::PayloadError;
use super::webhooks::{WebhookEndpoint, WebhookRoutes};
use crate::domains::posts::{MediaType, Platform, Post, PostType};
use crate::domains::social_accounts::SocialAccount;

/// Body field carrying the platform access token.
pub const CREDENTIAL_FIELD: &str = "access_token";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookRequest {
    pub endpoint: WebhookEndpoint,
    pub url: String,
    pub body: Map<String, Value>,
}

impl WebhookRequest {
    pub fn body_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

pub fn build_webhook_request(
    post: &Post,
    account: &SocialAccount,
    routes: &WebhookRoutes,
) -> Result<WebhookRequest, PayloadError> {
    let unsupported = || PayloadError::UnsupportedPostType {
        platform: post.platform,
        post_type: post.post_type,
    };

    let (endpoint, mut body) = match post.platform {
        Platform::Instagram => instagram_body(post).ok_or_else(unsupported)?,
        Platform::Facebook => facebook_body(post).ok_or_else(unsupported)?,
        Platform::Gmb => return Err(unsupported()),
    };

    let url = routes.url_for(endpoint).ok_or_else(unsupported)?.to_string();

    let token = account.credential().ok_or(PayloadError::MissingCredential {
        platform: account.platform,
    })?;
    body.insert(CREDENTIAL_FIELD.to_string(), Value::from(token));

    Ok(WebhookRequest {
        endpoint,
        url,
        body,
    })
}

fn instagram_body(post: &Post) -> Option<(WebhookEndpoint, Map<String, Value>)> {
    let mut body = Map::new();

    let endpoint = match post.post_type {
        PostType::Image => {
            body.insert("caption".into(), caption(post));
            body.insert("url".into(), first_media_url(post));
            insert_location(&mut body, "location_id", post);
            insert_user_tags(&mut body, post);
            WebhookEndpoint::InstagramPostImage
        }
        PostType::Carrousel => {
            body.insert("caption".into(), caption(post));
            let medias = post
                .medias
                .iter()
                .map(|media| serde_json::json!({ "url": media.url, "type": media.media_type }))
                .collect();
            body.insert("medias".into(), Value::Array(medias));
            insert_location(&mut body, "location_id", post);
            insert_user_tags(&mut body, post);
            WebhookEndpoint::InstagramPostCarrousel
        }
        PostType::Story | PostType::Stories => {
            let media_type = post
                .first_media()
                .map(|media| media.media_type)
                .unwrap_or(MediaType::Image);
            body.insert("url".into(), first_media_url(post));
            body.insert("type".into(), serde_json::json!(media_type));
            WebhookEndpoint::InstagramPostStories
        }
        PostType::Reel => {
            body.insert("caption".into(), caption(post));
            body.insert("url".into(), first_media_url(post));
            insert_location(&mut body, "location_id", post);
            WebhookEndpoint::InstagramPostReels
        }
        PostType::Text | PostType::Video | PostType::Link => return None,
    };

    Some((endpoint, body))
}

fn facebook_body(post: &Post) -> Option<(WebhookEndpoint, Map<String, Value>)> {
    let mut body = Map::new();

    let endpoint = match post.post_type {
        PostType::Text => {
            body.insert("message".into(), caption(post));
            WebhookEndpoint::FacebookPostTexte
        }
        PostType::Image => {
            body.insert("caption".into(), caption(post));
            body.insert("url".into(), first_media_url(post));
            WebhookEndpoint::FacebookPostImage
        }
        PostType::Video => {
            body.insert("description".into(), caption(post));
            body.insert("url".into(), first_media_url(post));
            WebhookEndpoint::FacebookPostVideo
        }
        PostType::Carrousel => {
            body.insert("message".into(), caption(post));
            let medias = post
                .medias
                .iter()
                .map(|media| serde_json::json!({ "url": media.url }))
                .collect();
            body.insert("medias".into(), Value::Array(medias));
            WebhookEndpoint::FacebookPostCarrousel
        }
        PostType::Link => {
            body.insert("message".into(), caption(post));
            body.insert(
                "link".into(),
                Value::from(post.link.clone().unwrap_or_default()),
            );
            WebhookEndpoint::FacebookPostLinkpreview
        }
        PostType::Reel | PostType::Story | PostType::Stories => return None,
    };

    // Facebook calls the location a "place"
    insert_location(&mut body, "place", post);

    Some((endpoint, body))
}

fn caption(post: &Post) -> Value {
    Value::from(post.caption.clone().unwrap_or_default())
}

fn first_media_url(post: &Post) -> Value {
    Value::from(
        post.first_media()
            .map(|media| media.url.clone())
            .unwrap_or_default(),
    )
}

fn insert_location(body: &mut Map<String, Value>, field: &str, post: &Post) {
    if let Some(location) = post.location_id.as_deref().filter(|id| !id.is_empty()) {
        body.insert(field.to_string(), Value::from(location));
    }
}

/// Tags whose coordinates are not finite numbers are dropped.
fn insert_user_tags(body: &mut Map<String, Value>, post: &Post) {
    let tags: Vec<Value> = post
        .user_tags()
        .iter()
        .filter_map(|tag| {
            let x = Number::from_f64(tag.x)?;
            let y = Number::from_f64(tag.y)?;
            let mut entry = Map::new();
            entry.insert("username".into(), Value::String(tag.username.clone()));
            entry.insert("x".into(), Value::Number(x));
            entry.insert("y".into(), Value::Number(y));
            Some(Value::Object(entry))
        })
        .collect();

    if !tags.is_empty() {
        body.insert("user_tags".into(), Value::Array(tags));
    }
}
