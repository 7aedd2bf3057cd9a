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
use crate::server::dto::{CreateSubjectRequest, UpdateSubjectRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_name;
use crate::types::Subject;

pub async fn create_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubjectRequest>,
) -> impl IntoResponse {
    validate_name(&req.name, "Subject name")?;

    let now = Utc::now();
    let subject = Subject {
        id: Uuid::new_v4().to_string(),
        category_id: req.category_id,
        name: req.name,
        created_at: now,
        updated_at: now,
    };

    // The store rejects a dangling category with a validation error
    state
        .store
        .create_subject(&subject)
        .api_err("Failed to create subject")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(subject))))
}

pub async fn update_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubjectRequest>,
) -> impl IntoResponse {
    let mut subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    if let Some(name) = req.name {
        validate_name(&name, "Subject name")?;
        subject.name = name;
    }
    subject.updated_at = Utc::now();

    state
        .store
        .update_subject(&subject)
        .api_err("Failed to update subject")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subject)))
}

/// Removes the subject and, in the same unit of work, its topics and
/// exercises, every user's assignment of it, and any current-topic
/// pointer into it.
pub async fn delete_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    state
        .store
        .delete_subject(&subject.id)
        .api_err("Failed to delete subject")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
