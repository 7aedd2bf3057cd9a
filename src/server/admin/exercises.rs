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
use crate::server::dto::{CreateExerciseRequest, UpdateExerciseRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_name;
use crate::types::Exercise;

pub async fn create_exercise(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateExerciseRequest>,
) -> impl IntoResponse {
    validate_name(&req.title, "Exercise title")?;

    let now = Utc::now();
    let exercise = Exercise {
        id: Uuid::new_v4().to_string(),
        topic_id: req.topic_id,
        title: req.title,
        description: req.description,
        difficulty: req.difficulty,
        link: req.link,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_exercise(&exercise)
        .api_err("Failed to create exercise")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(exercise))))
}

pub async fn update_exercise(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateExerciseRequest>,
) -> impl IntoResponse {
    let mut exercise = state
        .store
        .get_exercise(&id)
        .api_err("Failed to get exercise")?
        .or_not_found("Exercise not found")?;

    if let Some(title) = req.title {
        validate_name(&title, "Exercise title")?;
        exercise.title = title;
    }
    if let Some(description) = req.description {
        exercise.description = description;
    }
    if let Some(difficulty) = req.difficulty {
        exercise.difficulty = difficulty;
    }
    if let Some(link) = req.link {
        exercise.link = if link.is_empty() { None } else { Some(link) };
    }
    exercise.updated_at = Utc::now();

    state
        .store
        .update_exercise(&exercise)
        .api_err("Failed to update exercise")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(exercise)))
}

pub async fn delete_exercise(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let exercise = state
        .store
        .get_exercise(&id)
        .api_err("Failed to get exercise")?
        .or_not_found("Exercise not found")?;

    state
        .store
        .delete_exercise(&exercise.id)
        .api_err("Failed to delete exercise")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
