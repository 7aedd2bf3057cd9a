use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateTopicRequest, UpdateTopicRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_name;
use crate::types::Topic;

pub async fn create_topic(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTopicRequest>,
) -> impl IntoResponse {
    validate_name(&req.name, "Topic name")?;

    let now = Utc::now();
    let topic = Topic {
        id: Uuid::new_v4().to_string(),
        subject_id: req.subject_id,
        name: req.name,
        content: req.content,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_topic(&topic)
        .api_err("Failed to create topic")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(topic))))
}

pub async fn update_topic(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTopicRequest>,
) -> impl IntoResponse {
    let mut topic = state
        .store
        .get_topic(&id)
        .api_err("Failed to get topic")?
        .or_not_found("Topic not found")?;

    if let Some(name) = req.name {
        validate_name(&name, "Topic name")?;
        topic.name = name;
    }
    if let Some(content) = req.content {
        topic.content = content;
    }
    topic.updated_at = Utc::now();

    state
        .store
        .update_topic(&topic)
        .api_err("Failed to update topic")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(topic)))
}

/// Removes the topic and its exercises; any user pointing at it as
/// their current topic has the pointer cleared.
pub async fn delete_topic(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let topic = state
        .store
        .get_topic(&id)
        .api_err("Failed to get topic")?
        .or_not_found("Topic not found")?;

    state
        .store
        .delete_topic(&topic.id)
        .api_err("Failed to delete topic")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
