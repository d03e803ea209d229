//! `POST /api/posts/publish`: publish one post now, on behalf of a dashboard user.

use axum::{body::Bytes, extract::Extension, Json};
use serde::Serialize;
use serde_json::Value;

use crate::common::{AuthError, PostId};
use crate::domains::auth::User;
use crate::domains::publishing::PublishError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

const INVALID_POST_ID: &str = "postId requis et doit être une chaîne de caractères";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_post_id: Option<String>,
    pub message: String,
}

pub async fn publish_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let user = authorize_publisher(&state, auth_user.map(|Extension(user)| user)).await?;

    let raw_post_id = parse_post_id(&body).ok_or_else(|| ApiError::bad_request(INVALID_POST_ID))?;

    // A malformed id cannot match any post
    let post_id = PostId::parse(&raw_post_id)
        .map_err(|_| ApiError::from(PublishError::PostNotFound(raw_post_id.clone())))?;

    tracing::info!(post_id = %post_id, user_id = %user.id, "Manual publish requested");

    let success = state.publisher.publish(post_id).await.map_err(|e| {
        tracing::warn!(post_id = %post_id, error = %e, "Manual publish failed");
        ApiError::from(e)
    })?;

    Ok(Json(PublishResponse {
        success: true,
        external_post_id: success.external_post_id,
        message: "Post publié avec succès".to_string(),
    }))
}

/// Signed-in manager or admin; the role always comes from the database.
async fn authorize_publisher(
    state: &AppState,
    auth_user: Option<AuthUser>,
) -> Result<User, AuthError> {
    let auth_user = auth_user.ok_or(AuthError::AuthenticationRequired)?;

    match state.deps.store.find_user(auth_user.user_id).await? {
        Some(user) if user.role.can_publish() => Ok(user),
        _ => Err(AuthError::Forbidden),
    }
}

/// Non-empty string under `postId`, or nothing.
fn parse_post_id(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("postId")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}
