use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{AssignSubjectRequest, SetCurrentTopicRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

use super::load_user_with_subjects;

pub async fn get_me(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let user = load_user_with_subjects(&state, auth.user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Self-enrollment. Assigning an already-assigned subject is a no-op
/// success.
pub async fn assign_subject(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignSubjectRequest>,
) -> impl IntoResponse {
    state
        .store
        .get_subject(&req.subject_id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    state
        .store
        .assign_subject(&auth.user.id, &req.subject_id)
        .api_err("Failed to assign subject")?;

    let user = load_user_with_subjects(&state, auth.user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn unassign_subject(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .unassign_subject(&auth.user.id, &subject_id)
        .api_err("Failed to unassign subject")?;

    // Re-read: unassignment may have cleared the current-topic pointer
    let user = state
        .store
        .get_user(&auth.user.id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;
    let user = load_user_with_subjects(&state, user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Explicitly selects the current topic. Fails when the topic's subject
/// is not in the caller's assigned set; a null topic clears the pointer.
pub async fn set_current_topic(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetCurrentTopicRequest>,
) -> impl IntoResponse {
    state
        .store
        .set_current_topic(&auth.user.id, req.topic_id.as_deref())
        .api_err("Failed to set current topic")?;

    let user = state
        .store
        .get_user(&auth.user.id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;
    let user = load_user_with_subjects(&state, user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}
