mod catalog;
mod me;
mod progress;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::types::{User, UserWithSubjects};

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Catalog browsing
        .route("/categories", get(catalog::list_categories))
        .route("/subjects", get(catalog::list_subjects))
        .route("/subjects/{id}", get(catalog::get_subject))
        .route("/subjects/{id}/topics", get(catalog::list_subject_topics))
        .route(
            "/subjects/{id}/exercises",
            get(catalog::list_subject_exercises),
        )
        .route("/topics/{id}", get(catalog::get_topic))
        // Profile and enrollment
        .route("/me", get(me::get_me))
        .route("/me/subjects", post(me::assign_subject))
        .route("/me/subjects/{id}", delete(me::unassign_subject))
        .route("/me/current-topic", put(me::set_current_topic))
        // Progress
        .route("/dashboard", get(progress::get_dashboard))
        .route("/progress", get(progress::list_attempts))
        .route("/progress/summary", get(progress::get_summary))
        .route("/progress/attempts", post(progress::record_attempt))
        .route(
            "/progress/topics/{id}/toggle",
            post(progress::toggle_topic_completion),
        )
}

/// Widens a user record with its assigned subject ids, the shape most
/// responses return.
pub fn load_user_with_subjects(
    state: &Arc<AppState>,
    user: User,
) -> Result<UserWithSubjects, ApiError> {
    let assigned_subject_ids = state
        .store
        .list_assigned_subject_ids(&user.id)
        .api_err("Failed to list assigned subjects")?;

    Ok(UserWithSubjects {
        user,
        assigned_subject_ids,
    })
}
