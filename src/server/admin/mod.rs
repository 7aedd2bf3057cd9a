mod categories;
mod exercises;
mod stats;
mod subjects;
mod submissions;
mod topics;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Category routes
        .route("/categories", post(categories::create_category))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", patch(categories::update_category))
        .route("/categories/{id}", delete(categories::delete_category))
        // Subject routes
        .route("/subjects", post(subjects::create_subject))
        .route("/subjects/{id}", patch(subjects::update_subject))
        .route("/subjects/{id}", delete(subjects::delete_subject))
        // Topic routes
        .route("/topics", post(topics::create_topic))
        .route("/topics/{id}", patch(topics::update_topic))
        .route("/topics/{id}", delete(topics::delete_topic))
        // Exercise routes
        .route("/exercises", post(exercises::create_exercise))
        .route("/exercises/{id}", patch(exercises::update_exercise))
        .route("/exercises/{id}", delete(exercises::delete_exercise))
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/tokens", post(users::create_user_token))
        // Assignment on a user's behalf
        .route("/users/{id}/subjects", post(users::assign_subject))
        .route(
            "/users/{id}/subjects/{subject_id}",
            delete(users::unassign_subject),
        )
        // Aggregates
        .route("/stats", get(stats::get_stats))
        .route("/submissions", get(submissions::list_submissions))
}
