use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{AttemptFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_difficulty(s: &str) -> Difficulty {
    Difficulty::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid difficulty in database: '{}'", s);
        Difficulty::Easy
    })
}

fn parse_status(s: &str) -> AttemptStatus {
    AttemptStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid attempt status in database: '{}'", s);
        AttemptStatus::Attempted
    })
}

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid role in database: '{}'", s);
        Role::User
    })
}

fn read_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn read_subject(row: &Row) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn read_topic(row: &Row) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn read_exercise(row: &Row) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        difficulty: parse_difficulty(&row.get::<_, String>(4)?),
        link: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn read_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role: parse_role(&row.get::<_, String>(2)?),
        current_topic_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn read_attempt(row: &Row) -> rusqlite::Result<Attempt> {
    Ok(Attempt {
        user_id: row.get(0)?,
        exercise_id: row.get(1)?,
        answer: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn read_completion(row: &Row) -> rusqlite::Result<TopicCompletion> {
    Ok(TopicCompletion {
        user_id: row.get(0)?,
        topic_id: row.get(1)?,
        completed: row.get::<_, i64>(2)? != 0,
        updated_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

const CATEGORY_COLS: &str = "id, name, created_at";
const SUBJECT_COLS: &str = "id, category_id, name, created_at, updated_at";
const TOPIC_COLS: &str = "id, subject_id, name, content, created_at, updated_at";
const EXERCISE_COLS: &str =
    "id, topic_id, title, description, difficulty, link, created_at, updated_at";
const USER_COLS: &str = "id, username, role, current_topic_id, created_at, updated_at";
const ATTEMPT_COLS: &str = "user_id, exercise_id, answer, status, updated_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Category operations

    fn create_category(&self, category: &Category) -> Result<()> {
        self.conn().execute(
            "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                category.id,
                category.name,
                format_datetime(&category.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CATEGORY_COLS} FROM categories WHERE id = ?1"),
            params![id],
            read_category,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CATEGORY_COLS} FROM categories WHERE name = ?1"),
            params![name],
            read_category,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {CATEGORY_COLS} FROM categories ORDER BY name"))?;
        let rows = stmt.query_map([], read_category)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_category(&self, category: &Category) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![category.name, category.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_category(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let subjects: i32 = conn.query_row(
            "SELECT COUNT(*) FROM subjects WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if subjects > 0 {
            return Err(Error::Conflict(
                "category still owns subjects".to_string(),
            ));
        }

        let rows = conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Subject operations

    fn create_subject(&self, subject: &Subject) -> Result<()> {
        let conn = self.conn();
        let category_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            params![subject.category_id],
            |row| row.get(0),
        )?;
        if !category_exists {
            return Err(Error::Validation("category does not resolve".to_string()));
        }

        conn.execute(
            "INSERT INTO subjects (id, category_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                subject.id,
                subject.category_id,
                subject.name,
                format_datetime(&subject.created_at),
                format_datetime(&subject.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SUBJECT_COLS} FROM subjects WHERE id = ?1"),
            params![id],
            read_subject,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_subjects(&self, category_id: Option<&str>) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBJECT_COLS} FROM subjects
             WHERE ?1 IS NULL OR category_id = ?1
             ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![category_id], read_subject)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_subject(&self, subject: &Subject) -> Result<()> {
        // category_id is intentionally not updatable
        let rows = self.conn().execute(
            "UPDATE subjects SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                subject.name,
                format_datetime(&subject.updated_at),
                subject.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_subject(&self, id: &str) -> Result<bool> {
        // A single cascading DELETE: topics, exercises, assignments, attempts,
        // and completion rows go with the subject, and current-topic pointers
        // into it are nulled by the topics FK. Readers on the same connection
        // never observe a half-removed subtree.
        let rows = self
            .conn()
            .execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Topic operations

    fn create_topic(&self, topic: &Topic) -> Result<()> {
        let conn = self.conn();
        let subject_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = ?1)",
            params![topic.subject_id],
            |row| row.get(0),
        )?;
        if !subject_exists {
            return Err(Error::Validation("subject does not resolve".to_string()));
        }

        conn.execute(
            "INSERT INTO topics (id, subject_id, name, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                topic.id,
                topic.subject_id,
                topic.name,
                topic.content,
                format_datetime(&topic.created_at),
                format_datetime(&topic.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_topic(&self, id: &str) -> Result<Option<Topic>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOPIC_COLS} FROM topics WHERE id = ?1"),
            params![id],
            read_topic,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_topics(&self, subject_id: &str) -> Result<Vec<Topic>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOPIC_COLS} FROM topics WHERE subject_id = ?1
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![subject_id], read_topic)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_topic(&self, topic: &Topic) -> Result<()> {
        // subject_id is only meaningful at creation; updates leave it alone
        let rows = self.conn().execute(
            "UPDATE topics SET name = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                topic.name,
                topic.content,
                format_datetime(&topic.updated_at),
                topic.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_topic(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM topics WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Exercise operations

    fn create_exercise(&self, exercise: &Exercise) -> Result<()> {
        let conn = self.conn();
        let topic_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM topics WHERE id = ?1)",
            params![exercise.topic_id],
            |row| row.get(0),
        )?;
        if !topic_exists {
            return Err(Error::Validation("topic does not resolve".to_string()));
        }

        conn.execute(
            "INSERT INTO exercises (id, topic_id, title, description, difficulty, link, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                exercise.id,
                exercise.topic_id,
                exercise.title,
                exercise.description,
                exercise.difficulty.as_str(),
                exercise.link,
                format_datetime(&exercise.created_at),
                format_datetime(&exercise.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_exercise(&self, id: &str) -> Result<Option<Exercise>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {EXERCISE_COLS} FROM exercises WHERE id = ?1"),
            params![id],
            read_exercise,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_topic_exercises(&self, topic_id: &str) -> Result<Vec<Exercise>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXERCISE_COLS} FROM exercises WHERE topic_id = ?1
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![topic_id], read_exercise)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_subject_exercises(&self, subject_id: &str) -> Result<Vec<Exercise>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.topic_id, e.title, e.description, e.difficulty, e.link, e.created_at, e.updated_at
             FROM exercises e
             JOIN topics t ON t.id = e.topic_id
             WHERE t.subject_id = ?1
             ORDER BY t.created_at, t.id, e.created_at, e.id",
        )?;
        let rows = stmt.query_map(params![subject_id], read_exercise)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_exercise(&self, exercise: &Exercise) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE exercises SET title = ?1, description = ?2, difficulty = ?3, link = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                exercise.title,
                exercise.description,
                exercise.difficulty.as_str(),
                exercise.link,
                format_datetime(&exercise.updated_at),
                exercise.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_exercise(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM exercises WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, role, current_topic_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.username,
                user.role.as_str(),
                user.current_topic_id,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
            params![id],
            read_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
            params![username],
            read_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![cursor, limit], read_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Assignment ledger

    fn assign_subject(&self, user_id: &str, subject_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO user_subjects (user_id, subject_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, subject_id, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn unassign_subject(&self, user_id: &str, subject_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM user_subjects WHERE user_id = ?1 AND subject_id = ?2",
            params![user_id, subject_id],
        )?;
        // The pointer must not survive into a subject the user left
        tx.execute(
            "UPDATE users SET current_topic_id = NULL, updated_at = ?1
             WHERE id = ?2
               AND current_topic_id IN (SELECT id FROM topics WHERE subject_id = ?3)",
            params![format_datetime(&Utc::now()), user_id, subject_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_assigned_subject_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT subject_id FROM user_subjects WHERE user_id = ?1 ORDER BY created_at, subject_id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_assigned_subjects(&self, user_id: &str) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.category_id, s.name, s.created_at, s.updated_at
             FROM subjects s
             JOIN user_subjects us ON us.subject_id = s.id
             WHERE us.user_id = ?1
             ORDER BY us.created_at, s.id",
        )?;
        let rows = stmt.query_map(params![user_id], read_subject)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_current_topic(&self, user_id: &str, topic_id: Option<&str>) -> Result<()> {
        let conn = self.conn();

        if let Some(topic_id) = topic_id {
            let subject_id: Option<String> = conn
                .query_row(
                    "SELECT subject_id FROM topics WHERE id = ?1",
                    params![topic_id],
                    |row| row.get(0),
                )
                .optional()?;
            let subject_id = subject_id
                .ok_or_else(|| Error::Validation("topic does not resolve".to_string()))?;

            let assigned: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM user_subjects WHERE user_id = ?1 AND subject_id = ?2)",
                params![user_id, subject_id],
                |row| row.get(0),
            )?;
            if !assigned {
                return Err(Error::Validation(
                    "topic is not in an assigned subject".to_string(),
                ));
            }
        }

        let rows = conn.execute(
            "UPDATE users SET current_topic_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![topic_id, format_datetime(&Utc::now()), user_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Attempt operations

    fn upsert_attempt(
        &self,
        user_id: &str,
        exercise_id: &str,
        answer: &str,
        status: AttemptStatus,
    ) -> Result<Attempt> {
        let conn = self.conn();

        let exercise_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM exercises WHERE id = ?1)",
            params![exercise_id],
            |row| row.get(0),
        )?;
        if !exercise_exists {
            return Err(Error::Validation("exercise does not resolve".to_string()));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO attempts (user_id, exercise_id, answer, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, exercise_id) DO UPDATE SET
                 answer = excluded.answer,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                user_id,
                exercise_id,
                answer,
                status.as_str(),
                format_datetime(&now)
            ],
        )?;

        Ok(Attempt {
            user_id: user_id.to_string(),
            exercise_id: exercise_id.to_string(),
            answer: answer.to_string(),
            status,
            updated_at: now,
        })
    }

    fn get_attempt(&self, user_id: &str, exercise_id: &str) -> Result<Option<Attempt>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {ATTEMPT_COLS} FROM attempts WHERE user_id = ?1 AND exercise_id = ?2"
            ),
            params![user_id, exercise_id],
            read_attempt,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_attempts(&self, user_id: &str) -> Result<Vec<Attempt>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTEMPT_COLS} FROM attempts WHERE user_id = ?1
             ORDER BY updated_at DESC, exercise_id"
        ))?;
        let rows = stmt.query_map(params![user_id], read_attempt)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_attempt_details(
        &self,
        filter: &AttemptFilter,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<AttemptDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.user_id, a.exercise_id, a.answer, a.status, a.updated_at,
                    u.username, e.title, t.id, t.name, s.id, s.name
             FROM attempts a
             JOIN users u ON u.id = a.user_id
             JOIN exercises e ON e.id = a.exercise_id
             JOIN topics t ON t.id = e.topic_id
             JOIN subjects s ON s.id = t.subject_id
             WHERE a.user_id || ':' || a.exercise_id > ?1
               AND (?2 IS NULL OR a.user_id = ?2)
               AND (?3 IS NULL OR s.id = ?3)
               AND (?4 IS NULL OR t.id = ?4)
             ORDER BY a.user_id || ':' || a.exercise_id
             LIMIT ?5",
        )?;

        let rows = stmt.query_map(
            params![
                cursor,
                filter.user_id,
                filter.subject_id,
                filter.topic_id,
                limit
            ],
            |row| {
                Ok(AttemptDetail {
                    attempt: Attempt {
                        user_id: row.get(0)?,
                        exercise_id: row.get(1)?,
                        answer: row.get(2)?,
                        status: parse_status(&row.get::<_, String>(3)?),
                        updated_at: parse_datetime(&row.get::<_, String>(4)?),
                    },
                    username: row.get(5)?,
                    exercise_title: row.get(6)?,
                    topic_id: row.get(7)?,
                    topic_name: row.get(8)?,
                    subject_id: row.get(9)?,
                    subject_name: row.get(10)?,
                })
            },
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Topic completion operations

    fn toggle_topic_completion(&self, user_id: &str, topic_id: &str) -> Result<TopicCompletion> {
        let conn = self.conn();

        let topic_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM topics WHERE id = ?1)",
            params![topic_id],
            |row| row.get(0),
        )?;
        if !topic_exists {
            return Err(Error::Validation("topic does not resolve".to_string()));
        }

        // First toggle creates the row as completed; later toggles flip it.
        // One statement, so concurrent toggles on the same key serialize
        // cleanly on the connection.
        let now = Utc::now();
        conn.execute(
            "INSERT INTO topic_completions (user_id, topic_id, completed, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(user_id, topic_id) DO UPDATE SET
                 completed = 1 - topic_completions.completed,
                 updated_at = excluded.updated_at",
            params![user_id, topic_id, format_datetime(&now)],
        )?;

        conn.query_row(
            "SELECT user_id, topic_id, completed, updated_at
             FROM topic_completions WHERE user_id = ?1 AND topic_id = ?2",
            params![user_id, topic_id],
            read_completion,
        )
        .map_err(Error::from)
    }

    fn list_topic_completions(&self, user_id: &str) -> Result<Vec<TopicCompletion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, topic_id, completed, updated_at
             FROM topic_completions WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(params![user_id], read_completion)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Admin aggregates

    fn count_users(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn count_subjects(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }
}
