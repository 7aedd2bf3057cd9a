//! Read-only projections over the content hierarchy, the assignment
//! ledger, and the per-user progress records.
//!
//! Everything here is a pure function of the rows handed in: given the
//! same store contents, the same dashboard and summary come out every
//! time. Nothing is cached and nothing is written back.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Subject, Topic, TopicCompletion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProgress {
    #[serde(flatten)]
    pub topic: Topic,
    pub user_completed: bool,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectProgress {
    #[serde(flatten)]
    pub subject: Subject,
    pub topics: Vec<TopicProgress>,
}

/// The per-user dashboard: assigned subjects with their topics annotated
/// with completion state and the current-topic marker. Exercises are
/// deliberately absent; they are loaded lazily per subject or topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub subjects: Vec<SubjectProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<Topic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject_id: String,
    pub name: String,
    pub percent_completed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub subjects: Vec<SubjectSummary>,
}

/// Completion percentage in [0, 100]. A subject with no topics reports 0
/// rather than dividing by zero. Rounding is left to presentation.
#[must_use]
pub fn percent_completed(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * completed as f64 / total as f64
}

fn completed_topic_ids(completions: &[TopicCompletion]) -> HashSet<&str> {
    completions
        .iter()
        .filter(|c| c.completed)
        .map(|c| c.topic_id.as_str())
        .collect()
}

/// Assembles the dashboard view. Completion rows that do not match any
/// topic of an assigned subject are stale and fall out on their own,
/// since only the handed-in hierarchy is walked.
#[must_use]
pub fn build_dashboard(
    subjects: Vec<(Subject, Vec<Topic>)>,
    completions: &[TopicCompletion],
    current_topic_id: Option<&str>,
) -> Dashboard {
    let completed = completed_topic_ids(completions);

    let mut current_topic = None;
    let subjects = subjects
        .into_iter()
        .map(|(subject, topics)| {
            let topics = topics
                .into_iter()
                .map(|topic| {
                    let is_current = current_topic_id == Some(topic.id.as_str());
                    if is_current {
                        current_topic = Some(topic.clone());
                    }
                    TopicProgress {
                        user_completed: completed.contains(topic.id.as_str()),
                        is_current,
                        topic,
                    }
                })
                .collect();
            SubjectProgress { subject, topics }
        })
        .collect();

    Dashboard {
        subjects,
        current_topic,
    }
}

/// Per-subject completion percentages for the handed-in hierarchy.
#[must_use]
pub fn summarize(subjects: &[(Subject, Vec<Topic>)], completions: &[TopicCompletion]) -> ProgressSummary {
    let completed = completed_topic_ids(completions);

    let subjects = subjects
        .iter()
        .map(|(subject, topics)| {
            let done = topics
                .iter()
                .filter(|t| completed.contains(t.id.as_str()))
                .count();
            SubjectSummary {
                subject_id: subject.id.clone(),
                name: subject.name.clone(),
                percent_completed: percent_completed(done, topics.len()),
            }
        })
        .collect();

    ProgressSummary { subjects }
}
