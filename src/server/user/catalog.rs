use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ListSubjectsParams, TopicDetailResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::ExerciseWithAttempt;

pub async fn list_categories(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = state
        .store
        .list_categories()
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}

pub async fn list_subjects(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSubjectsParams>,
) -> impl IntoResponse {
    let subjects = state
        .store
        .list_subjects(params.category.as_deref())
        .api_err("Failed to list subjects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subjects)))
}

pub async fn get_subject(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subject)))
}

pub async fn list_subject_topics(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    let topics = state
        .store
        .list_topics(&id)
        .api_err("Failed to list topics")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(topics)))
}

/// The study view: a topic with its exercises and the caller's latest
/// attempt on each. Opening a topic this way also selects it as the
/// caller's current topic when it belongs to an assigned subject;
/// browsing outside the assigned set stays read-only.
pub async fn get_topic(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let topic = state
        .store
        .get_topic(&id)
        .api_err("Failed to get topic")?
        .or_not_found("Topic not found")?;

    match state.store.set_current_topic(&auth.user.id, Some(&topic.id)) {
        Ok(()) | Err(Error::Validation(_)) => {}
        Err(_) => return Err(ApiError::internal("Failed to set current topic")),
    }

    let exercises = state
        .store
        .list_topic_exercises(&topic.id)
        .api_err("Failed to list exercises")?;

    let mut with_attempts = Vec::with_capacity(exercises.len());
    for exercise in exercises {
        let attempt = state
            .store
            .get_attempt(&auth.user.id, &exercise.id)
            .api_err("Failed to get attempt")?;
        with_attempts.push(ExerciseWithAttempt { exercise, attempt });
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(TopicDetailResponse {
        topic,
        exercises: with_attempts,
    })))
}

/// Lazy per-subject exercise load for the dashboard, annotated with the
/// caller's attempts.
pub async fn list_subject_exercises(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    let exercises = state
        .store
        .list_subject_exercises(&id)
        .api_err("Failed to list exercises")?;

    let mut with_attempts = Vec::with_capacity(exercises.len());
    for exercise in exercises {
        let attempt = state
            .store
            .get_attempt(&auth.user.id, &exercise.id)
            .api_err("Failed to get attempt")?;
        with_attempts.push(ExerciseWithAttempt { exercise, attempt });
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(with_attempts)))
}
