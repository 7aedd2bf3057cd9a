use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::ListSubmissionsParams;
use crate::server::response::{
    ApiError, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::store::AttemptFilter;

/// Every user's latest attempts across the hierarchy, optionally
/// narrowed by user, subject, or topic.
pub async fn list_submissions(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSubmissionsParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");
    let filter = AttemptFilter {
        user_id: params.user,
        subject_id: params.subject,
        topic_id: params.topic,
    };

    let submissions = state
        .store
        .list_attempt_details(&filter, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list submissions")?;

    let (submissions, next_cursor, has_more) = paginate(submissions, DEFAULT_PAGE_SIZE as usize, |s| {
        format!("{}:{}", s.attempt.user_id, s.attempt.exercise_id)
    });

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        submissions,
        next_cursor,
        has_more,
    )))
}
