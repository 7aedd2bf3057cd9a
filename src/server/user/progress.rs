use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::progress;
use crate::server::AppState;
use crate::server::dto::RecordAttemptRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{Subject, Topic};

fn load_assigned_hierarchy(
    state: &Arc<AppState>,
    user_id: &str,
) -> Result<Vec<(Subject, Vec<Topic>)>, ApiError> {
    let subjects = state
        .store
        .list_assigned_subjects(user_id)
        .api_err("Failed to list assigned subjects")?;

    let mut nested = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let topics = state
            .store
            .list_topics(&subject.id)
            .api_err("Failed to list topics")?;
        nested.push((subject, topics));
    }
    Ok(nested)
}

/// Assigned subjects with per-topic completion state and the current
/// topic highlighted. Recomputed from the stores on every call.
pub async fn get_dashboard(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let nested = load_assigned_hierarchy(&state, &auth.user.id)?;
    let completions = state
        .store
        .list_topic_completions(&auth.user.id)
        .api_err("Failed to list topic completions")?;

    let dashboard = progress::build_dashboard(
        nested,
        &completions,
        auth.user.current_topic_id.as_deref(),
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(dashboard)))
}

pub async fn get_summary(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let nested = load_assigned_hierarchy(&state, &auth.user.id)?;
    let completions = state
        .store
        .list_topic_completions(&auth.user.id)
        .api_err("Failed to list topic completions")?;

    let summary = progress::summarize(&nested, &completions);

    Ok::<_, ApiError>(Json(ApiResponse::success(summary)))
}

pub async fn list_attempts(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let attempts = state
        .store
        .list_user_attempts(&auth.user.id)
        .api_err("Failed to list attempts")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(attempts)))
}

/// Records (or overwrites) the caller's attempt for one exercise. The
/// answer may be empty regardless of status; no judgment happens here.
pub async fn record_attempt(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordAttemptRequest>,
) -> impl IntoResponse {
    let attempt = state
        .store
        .upsert_attempt(&auth.user.id, &req.exercise_id, &req.answer, req.status)
        .api_err("Failed to record attempt")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(attempt))))
}

/// Flips the caller's completion flag for a topic. Deliberately not
/// reconciled with exercise-level attempt statuses.
pub async fn toggle_topic_completion(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let completion = state
        .store
        .toggle_topic_completion(&auth.user.id, &id)
        .api_err("Failed to toggle topic completion")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(completion)))
}
