mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Filters for the admin submissions listing. All fields are optional
/// and combine with AND.
#[derive(Debug, Default, Clone)]
pub struct AttemptFilter {
    pub user_id: Option<String>,
    pub subject_id: Option<String>,
    pub topic_id: Option<String>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Category operations
    fn create_category(&self, category: &Category) -> Result<()>;
    fn get_category(&self, id: &str) -> Result<Option<Category>>;
    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn list_categories(&self) -> Result<Vec<Category>>;
    fn update_category(&self, category: &Category) -> Result<()>;
    /// Refuses with `Error::Conflict` while the category still owns subjects.
    fn delete_category(&self, id: &str) -> Result<bool>;

    // Subject operations
    /// Fails with `Error::Validation` if the subject's category does not resolve.
    fn create_subject(&self, subject: &Subject) -> Result<()>;
    fn get_subject(&self, id: &str) -> Result<Option<Subject>>;
    fn list_subjects(&self, category_id: Option<&str>) -> Result<Vec<Subject>>;
    fn update_subject(&self, subject: &Subject) -> Result<()>;
    /// Cascades to topics, exercises, assignments, and per-user progress
    /// rows; clears current-topic pointers into the subject. All-or-nothing.
    fn delete_subject(&self, id: &str) -> Result<bool>;

    // Topic operations
    /// Fails with `Error::Validation` if the topic's subject does not resolve.
    fn create_topic(&self, topic: &Topic) -> Result<()>;
    fn get_topic(&self, id: &str) -> Result<Option<Topic>>;
    /// Topics in creation order.
    fn list_topics(&self, subject_id: &str) -> Result<Vec<Topic>>;
    fn update_topic(&self, topic: &Topic) -> Result<()>;
    fn delete_topic(&self, id: &str) -> Result<bool>;

    // Exercise operations
    /// Fails with `Error::Validation` if the exercise's topic does not resolve.
    fn create_exercise(&self, exercise: &Exercise) -> Result<()>;
    fn get_exercise(&self, id: &str) -> Result<Option<Exercise>>;
    fn list_topic_exercises(&self, topic_id: &str) -> Result<Vec<Exercise>>;
    fn list_subject_exercises(&self, subject_id: &str) -> Result<Vec<Exercise>>;
    fn update_exercise(&self, exercise: &Exercise) -> Result<()>;
    fn delete_exercise(&self, id: &str) -> Result<bool>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Assignment ledger
    /// Idempotent; assigning an already-assigned subject is a no-op success.
    fn assign_subject(&self, user_id: &str, subject_id: &str) -> Result<()>;
    /// Idempotent; clears the user's current topic if it points into the
    /// unassigned subject.
    fn unassign_subject(&self, user_id: &str, subject_id: &str) -> Result<()>;
    fn list_assigned_subject_ids(&self, user_id: &str) -> Result<Vec<String>>;
    fn list_assigned_subjects(&self, user_id: &str) -> Result<Vec<Subject>>;
    /// Fails with `Error::Validation` unless the topic's subject is in the
    /// user's assigned set. `None` clears the pointer.
    fn set_current_topic(&self, user_id: &str, topic_id: Option<&str>) -> Result<()>;

    // Attempt operations
    /// Upserts the (user, exercise) attempt and refreshes `updated_at`.
    /// Fails with `Error::Validation` if the exercise does not resolve.
    fn upsert_attempt(
        &self,
        user_id: &str,
        exercise_id: &str,
        answer: &str,
        status: AttemptStatus,
    ) -> Result<Attempt>;
    fn get_attempt(&self, user_id: &str, exercise_id: &str) -> Result<Option<Attempt>>;
    fn list_user_attempts(&self, user_id: &str) -> Result<Vec<Attempt>>;
    fn list_attempt_details(
        &self,
        filter: &AttemptFilter,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<AttemptDetail>>;

    // Topic completion operations
    /// Flips the per-user completion flag in one statement.
    /// Fails with `Error::Validation` if the topic does not resolve.
    fn toggle_topic_completion(&self, user_id: &str, topic_id: &str) -> Result<TopicCompletion>;
    fn list_topic_completions(&self, user_id: &str) -> Result<Vec<TopicCompletion>>;

    // Admin aggregates
    fn count_users(&self) -> Result<i64>;
    fn count_subjects(&self) -> Result<i64>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Initialization check
    fn has_admin_user(&self) -> Result<bool>;
}
