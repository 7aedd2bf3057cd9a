use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::StatsResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn get_stats(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_count = state.store.count_users().api_err("Failed to count users")?;
    let subject_count = state
        .store
        .count_subjects()
        .api_err("Failed to count subjects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(StatsResponse {
        user_count,
        subject_count,
    })))
}
