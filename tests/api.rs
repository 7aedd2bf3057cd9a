//! HTTP API integration tests.
//!
//! Each test boots an isolated server (own temp data dir and port) and
//! drives it end to end through the public API.

mod common;

use common::test_server::TestServer;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

struct Api {
    client: Client,
    base_url: String,
    admin_token: String,
}

impl Api {
    fn new(server: &TestServer) -> Self {
        Self {
            client: Client::new(),
            base_url: server.base_url.clone(),
            admin_token: server.admin_token.clone(),
        }
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("request")
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("request")
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request")
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request")
    }

    async fn create_category(&self, name: &str) -> String {
        let resp = self
            .post(&self.admin_token, "/api/v1/admin/categories", json!({"name": name}))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        data(resp).await["id"].as_str().expect("category id").to_string()
    }

    async fn create_subject(&self, category_id: &str, name: &str) -> String {
        let resp = self
            .post(
                &self.admin_token,
                "/api/v1/admin/subjects",
                json!({"name": name, "category_id": category_id}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        data(resp).await["id"].as_str().expect("subject id").to_string()
    }

    async fn create_topic(&self, subject_id: &str, name: &str) -> String {
        let resp = self
            .post(
                &self.admin_token,
                "/api/v1/admin/topics",
                json!({"name": name, "content": "<p>notes</p>", "subject_id": subject_id}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        data(resp).await["id"].as_str().expect("topic id").to_string()
    }

    async fn create_exercise(&self, topic_id: &str, title: &str) -> String {
        let resp = self
            .post(
                &self.admin_token,
                "/api/v1/admin/exercises",
                json!({
                    "title": title,
                    "description": "practice",
                    "difficulty": "Easy",
                    "topic_id": topic_id,
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        data(resp).await["id"].as_str().expect("exercise id").to_string()
    }

    /// Creates a learner account and mints a token for it.
    async fn create_user(&self, username: &str) -> (String, String) {
        let resp = self
            .post(
                &self.admin_token,
                "/api/v1/admin/users",
                json!({"username": username}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user_id = data(resp).await["id"].as_str().expect("user id").to_string();

        let resp = self
            .post(
                &self.admin_token,
                &format!("/api/v1/admin/users/{user_id}/tokens"),
                json!({}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let token = data(resp).await["token"].as_str().expect("token").to_string();

        (user_id, token)
    }
}

async fn data(resp: reqwest::Response) -> Value {
    let body: Value = resp.json().await.expect("parse body");
    body["data"].clone()
}

#[tokio::test]
async fn test_hierarchy_crud_and_referential_rejection() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    api.create_exercise(&topic_id, "Shortest path").await;

    // A topic cannot reference a subject that does not resolve
    let resp = api
        .post(
            &server.admin_token,
            "/api/v1/admin/topics",
            json!({"name": "x", "content": "", "subject_id": "nonexistent"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // And no topic was created by the failed call
    let resp = api
        .get(&server.admin_token, &format!("/api/v1/subjects/{subject_id}/topics"))
        .await;
    let topics = data(resp).await;
    assert_eq!(topics.as_array().expect("topics").len(), 1);

    // Same for subjects referencing a dangling category
    let resp = api
        .post(
            &server.admin_token,
            "/api/v1/admin/subjects",
            json!({"name": "x", "category_id": "nonexistent"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Editing a topic does not need (or accept) a subject
    let resp = api
        .client
        .patch(format!("{}/api/v1/admin/topics/{topic_id}", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({"name": "BFS & friends"}))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data(resp).await["name"], "BFS & friends");
}

#[tokio::test]
async fn test_category_delete_guard() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;

    let resp = api
        .delete(&server.admin_token, &format!("/api/v1/admin/categories/{category_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = api
        .delete(&server.admin_token, &format!("/api/v1/admin/subjects/{subject_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = api
        .delete(&server.admin_token, &format!("/api/v1/admin/categories/{category_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_assignment_is_idempotent_and_current_topic_scoped() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    let other_subject = api.create_subject(&category_id, "Trees").await;
    let other_topic = api.create_topic(&other_subject, "AVL").await;

    let (_user_id, user_token) = api.create_user("alice").await;

    // Current topic in a subject the user has not opted into is rejected
    let resp = api
        .put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": topic_id}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Enroll twice; the ledger must hold the subject exactly once
    for _ in 0..2 {
        let resp = api
            .post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let me = data(api.get(&user_token, "/api/v1/me").await).await;
    let assigned = me["assigned_subject_ids"].as_array().expect("assigned");
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0], subject_id.as_str());

    // Now the explicit selection works...
    let resp = api
        .put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": topic_id}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data(resp).await["current_topic_id"], topic_id.as_str());

    // ...but still only inside the assigned set
    let resp = api
        .put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": other_topic}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_progress_summary_percentages() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let mut topic_ids = Vec::new();
    for name in ["t1", "t2", "t3", "t4"] {
        topic_ids.push(api.create_topic(&subject_id, name).await);
    }
    let empty_subject = api.create_subject(&category_id, "Empty").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    for sid in [&subject_id, &empty_subject] {
        api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": sid}))
            .await;
    }

    for topic_id in &topic_ids[..2] {
        let resp = api
            .post(&user_token, &format!("/api/v1/progress/topics/{topic_id}/toggle"), json!({}))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(data(resp).await["completed"], true);
    }

    let summary = data(api.get(&user_token, "/api/v1/progress/summary").await).await;
    let subjects = summary["subjects"].as_array().expect("subjects");
    assert_eq!(subjects.len(), 2);

    let percent_of = |id: &str| {
        subjects
            .iter()
            .find(|s| s["subject_id"] == id)
            .and_then(|s| s["percent_completed"].as_f64())
            .expect("percent")
    };
    assert_eq!(percent_of(&subject_id), 50.0);
    // A subject with no topics reports 0, never a division error
    assert_eq!(percent_of(&empty_subject), 0.0);

    // Toggling one off drops the percentage back down
    api.post(
        &user_token,
        &format!("/api/v1/progress/topics/{}/toggle", topic_ids[0]),
        json!({}),
    )
    .await;
    let summary = data(api.get(&user_token, "/api/v1/progress/summary").await).await;
    let subjects = summary["subjects"].as_array().expect("subjects");
    let percent = subjects
        .iter()
        .find(|s| s["subject_id"] == subject_id.as_str())
        .and_then(|s| s["percent_completed"].as_f64())
        .expect("percent");
    assert_eq!(percent, 25.0);
}

#[tokio::test]
async fn test_attempt_last_write_wins() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    let exercise_id = api.create_exercise(&topic_id, "Shortest path").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
        .await;

    let resp = api
        .post(
            &user_token,
            "/api/v1/progress/attempts",
            json!({"exercise_id": exercise_id, "answer": "a1", "status": "attempted"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = api
        .post(
            &user_token,
            "/api/v1/progress/attempts",
            json!({"exercise_id": exercise_id, "answer": "a2", "status": "completed"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let attempts = data(api.get(&user_token, "/api/v1/progress").await).await;
    let attempts = attempts.as_array().expect("attempts");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["answer"], "a2");
    assert_eq!(attempts[0]["status"], "completed");

    // An empty answer with completed status is legal
    let resp = api
        .post(
            &user_token,
            "/api/v1/progress/attempts",
            json!({"exercise_id": exercise_id, "answer": "", "status": "completed"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // A dangling exercise is rejected with no record created
    let resp = api
        .post(
            &user_token,
            "/api/v1/progress/attempts",
            json!({"exercise_id": "nonexistent", "answer": "x", "status": "attempted"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subject_delete_cascades_to_dashboard() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    let exercise_id = api.create_exercise(&topic_id, "Shortest path").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
        .await;
    api.put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": topic_id}))
        .await;
    api.post(
        &user_token,
        "/api/v1/progress/attempts",
        json!({"exercise_id": exercise_id, "answer": "x", "status": "completed"}),
    )
    .await;

    let dash = data(api.get(&user_token, "/api/v1/dashboard").await).await;
    assert_eq!(dash["subjects"].as_array().expect("subjects").len(), 1);
    assert_eq!(dash["current_topic"]["id"], topic_id.as_str());

    let resp = api
        .delete(&server.admin_token, &format!("/api/v1/admin/subjects/{subject_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The subject is gone from the dashboard and the pointer is cleared,
    // not dangling
    let dash = data(api.get(&user_token, "/api/v1/dashboard").await).await;
    assert_eq!(dash["subjects"].as_array().expect("subjects").len(), 0);
    assert!(dash["current_topic"].is_null());

    let me = data(api.get(&user_token, "/api/v1/me").await).await;
    assert!(me["current_topic_id"].is_null());
    assert_eq!(me["assigned_subject_ids"].as_array().expect("assigned").len(), 0);

    // The attempt rows went with the exercise
    let attempts = data(api.get(&user_token, "/api/v1/progress").await).await;
    assert_eq!(attempts.as_array().expect("attempts").len(), 0);
}

#[tokio::test]
async fn test_dashboard_marks_completion_and_current() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let t1 = api.create_topic(&subject_id, "BFS").await;
    let t2 = api.create_topic(&subject_id, "DFS").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
        .await;
    api.post(&user_token, &format!("/api/v1/progress/topics/{t1}/toggle"), json!({}))
        .await;
    api.put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": t2}))
        .await;

    let dash = data(api.get(&user_token, "/api/v1/dashboard").await).await;
    let topics = dash["subjects"][0]["topics"].as_array().expect("topics");
    assert_eq!(topics.len(), 2);

    let by_id = |id: &str| topics.iter().find(|t| t["id"] == id).expect("topic");
    assert_eq!(by_id(&t1)["user_completed"], true);
    assert_eq!(by_id(&t1)["is_current"], false);
    assert_eq!(by_id(&t2)["user_completed"], false);
    assert_eq!(by_id(&t2)["is_current"], true);
}

#[tokio::test]
async fn test_viewing_topic_selects_it_as_current() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    let exercise_id = api.create_exercise(&topic_id, "Shortest path").await;
    let other_subject = api.create_subject(&category_id, "Trees").await;
    let other_topic = api.create_topic(&other_subject, "AVL").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
        .await;

    // Opening the exercise list doubles as selecting the topic
    let detail = data(api.get(&user_token, &format!("/api/v1/topics/{topic_id}")).await).await;
    assert_eq!(detail["topic"]["id"], topic_id.as_str());
    let exercises = detail["exercises"].as_array().expect("exercises");
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0]["id"], exercise_id.as_str());

    let me = data(api.get(&user_token, "/api/v1/me").await).await;
    assert_eq!(me["current_topic_id"], topic_id.as_str());

    // Browsing a topic outside the assigned set is read-only: the
    // pointer stays where it was
    let resp = api.get(&user_token, &format!("/api/v1/topics/{other_topic}")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let me = data(api.get(&user_token, "/api/v1/me").await).await;
    assert_eq!(me["current_topic_id"], topic_id.as_str());
}

#[tokio::test]
async fn test_unassign_clears_current_topic() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;

    let (_user_id, user_token) = api.create_user("alice").await;
    api.post(&user_token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
        .await;
    api.put(&user_token, "/api/v1/me/current-topic", json!({"topic_id": topic_id}))
        .await;

    let resp = api
        .delete(&user_token, &format!("/api/v1/me/subjects/{subject_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = data(resp).await;
    assert!(me["current_topic_id"].is_null());
    assert_eq!(me["assigned_subject_ids"].as_array().expect("assigned").len(), 0);
}

#[tokio::test]
async fn test_admin_stats_and_submissions() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let category_id = api.create_category("DSA").await;
    let subject_id = api.create_subject(&category_id, "Graphs").await;
    let topic_id = api.create_topic(&subject_id, "BFS").await;
    let exercise_id = api.create_exercise(&topic_id, "Shortest path").await;

    let (user_id, user_token) = api.create_user("alice").await;
    let (other_id, other_token) = api.create_user("bob").await;
    for token in [&user_token, &other_token] {
        api.post(token, "/api/v1/me/subjects", json!({"subject_id": subject_id}))
            .await;
        api.post(
            token,
            "/api/v1/progress/attempts",
            json!({"exercise_id": exercise_id, "answer": "x", "status": "attempted"}),
        )
        .await;
    }

    // Admin account plus two learners
    let stats = data(api.get(&server.admin_token, "/api/v1/admin/stats").await).await;
    assert_eq!(stats["user_count"], 3);
    assert_eq!(stats["subject_count"], 1);

    let resp = api
        .get(&server.admin_token, "/api/v1/admin/submissions")
        .await;
    let body: Value = resp.json().await.expect("parse body");
    assert_eq!(body["data"].as_array().expect("submissions").len(), 2);

    let resp = api
        .get(
            &server.admin_token,
            &format!("/api/v1/admin/submissions?user={user_id}"),
        )
        .await;
    let body: Value = resp.json().await.expect("parse body");
    let submissions = body["data"].as_array().expect("submissions");
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["username"], "alice");
    assert_eq!(submissions[0]["exercise_title"], "Shortest path");
    assert_ne!(submissions[0]["user_id"], other_id.as_str());
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let server = TestServer::start().await;
    let api = Api::new(&server);

    let (_user_id, user_token) = api.create_user("alice").await;

    let resp = api.get(&user_token, "/api/v1/admin/stats").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = api
        .post(&user_token, "/api/v1/admin/categories", json!({"name": "x"}))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // No credentials at all
    let resp = api
        .client
        .get(format!("{}/api/v1/me", server.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Admins can use the learner surface
    let resp = api.get(&server.admin_token, "/api/v1/categories").await;
    assert_eq!(resp.status(), StatusCode::OK);
}
