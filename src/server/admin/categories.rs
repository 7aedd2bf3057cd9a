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
use crate::server::dto::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_name;
use crate::types::Category;

pub async fn create_category(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    validate_name(&req.name, "Category name")?;

    let existing = state
        .store
        .get_category_by_name(&req.name)
        .api_err("Failed to check existing category")?;

    if existing.is_some() {
        return Err(ApiError::conflict("Category already exists"));
    }

    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        created_at: Utc::now(),
    };

    state
        .store
        .create_category(&category)
        .api_err("Failed to create category")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

pub async fn list_categories(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = state
        .store
        .list_categories()
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}

pub async fn update_category(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> impl IntoResponse {
    validate_name(&req.name, "Category name")?;

    let mut category = state
        .store
        .get_category(&id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    if req.name != category.name
        && state
            .store
            .get_category_by_name(&req.name)
            .api_err("Failed to check existing category")?
            .is_some()
    {
        return Err(ApiError::conflict("Category already exists"));
    }

    category.name = req.name;
    state
        .store
        .update_category(&category)
        .api_err("Failed to update category")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(category)))
}

/// Deleting a category is refused while it still owns subjects; the
/// caller must delete those first.
pub async fn delete_category(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let category = state
        .store
        .get_category(&id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    state
        .store
        .delete_category(&category.id)
        .api_err("Failed to delete category")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
