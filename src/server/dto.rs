use serde::{Deserialize, Serialize};

use crate::types::{AttemptStatus, Difficulty, ExerciseWithAttempt, Role, Token, Topic};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubjectRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    pub name: String,
    #[serde(default)]
    pub content: String,
    /// Mandatory at creation; updates go through `UpdateTopicRequest`,
    /// which has no subject field.
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTopicRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExerciseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub link: Option<String>,
    pub topic_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExerciseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: Token,
}

#[derive(Debug, Deserialize)]
pub struct AssignSubjectRequest {
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetCurrentTopicRequest {
    /// `null` clears the pointer.
    pub topic_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordAttemptRequest {
    pub exercise_id: String,
    #[serde(default)]
    pub answer: String,
    pub status: AttemptStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSubjectsParams {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSubmissionsParams {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_count: i64,
    pub subject_count: i64,
}

/// A topic together with its exercises and the caller's latest attempt
/// on each, the unit the study view works from.
#[derive(Debug, Serialize)]
pub struct TopicDetailResponse {
    pub topic: Topic,
    pub exercises: Vec<ExerciseWithAttempt>,
}
