//! `/api/posts/check-scheduled`: the sweep, triggered by the external scheduler.
//!
//! `POST` publishes everything due; `GET` only lists it.

use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::common::PostId;
use crate::domains::posts::DuePost;
use crate::domains::publishing::{list_due_posts, publish_due_posts, SweepFailure};
use crate::server::app::{AppState, API_KEY_HEADER};
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub published: Vec<PostId>,
    pub failed: Vec<SweepFailure>,
}

#[derive(Debug, Serialize)]
pub struct DuePostsResponse {
    pub success: bool,
    pub count: usize,
    pub posts: Vec<DuePost>,
    pub now: String,
}

pub async fn check_scheduled_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiError> {
    verify_api_key(&state, &headers)?;

    let report = publish_due_posts(&state.publisher, state.deps.store.as_ref(), Utc::now())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load due posts");
            ApiError::internal("Erreur lors de la récupération des posts").with_details(e.to_string())
        })?;

    Ok(Json(SweepResponse {
        success: true,
        message: report.message(),
        count: report.count,
        published: report.published,
        failed: report.failed,
    }))
}

pub async fn list_scheduled_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<DuePostsResponse>, ApiError> {
    verify_api_key(&state, &headers)?;

    let now = Utc::now();
    let posts = list_due_posts(state.deps.store.as_ref(), now)
        .await
        .map_err(|e| ApiError::internal("Erreur lors de la récupération").with_details(e.to_string()))?;

    Ok(Json(DuePostsResponse {
        success: true,
        count: posts.len(),
        posts,
        now: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

fn verify_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.scheduler_api_key.as_deref() else {
        tracing::error!("SCHEDULER_API_KEY is not configured");
        return Err(ApiError::internal("Configuration manquante"));
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(provided) if keys_match(provided.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(ApiError::unauthorized("Clé API invalide")),
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
