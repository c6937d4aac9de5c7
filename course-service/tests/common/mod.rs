//! Shared setup for course-service integration tests.
//!
//! `TestApp` runs the real application on a free port with wiremock servers
//! standing in for Supabase and OpenAI. `mock_router` builds the router over
//! in-memory store and provider doubles for in-process `oneshot` tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use course_service::config::{
    CorsConfig, CourseConfig, OpenAiConfig, RecommendConfig, SearchConfig, SearchMode,
    SupabaseConfig,
};
use course_service::models::CourseRecord;
use course_service::services::providers::mock::MockEmbeddingProvider;
use course_service::services::providers::TextProvider;
use course_service::services::CourseStore;
use course_service::{build_router, AppState, Application};
use serde_json::{json, Value};
use service_core::config::Config;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

pub const EMBEDDING_DIM: usize = 4;

pub fn test_config(supabase_url: &str, openai_url: &str, mode: SearchMode) -> CourseConfig {
    CourseConfig {
        common: Config { port: 0 },
        supabase: SupabaseConfig {
            url: supabase_url.to_string(),
            api_key: "test-anon-key".to_string(),
            table: "courses".to_string(),
            select: "course_id,title,instructor,credits".to_string(),
            match_function: "match_courses".to_string(),
            timeout_secs: 1,
        },
        openai: OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: openai_url.to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: EMBEDDING_DIM,
            temperature: 0.2,
            timeout_secs: 1,
        },
        search: SearchConfig { mode },
        recommend: RecommendConfig { max_top_k: 10 },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
        },
    }
}

/// Running application wired to wiremock upstreams.
pub struct TestApp {
    pub address: String,
    pub supabase: MockServer,
    pub openai: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_mode(SearchMode::Title).await
    }

    pub async fn spawn_with_mode(mode: SearchMode) -> Self {
        let supabase = MockServer::start().await;
        let openai = MockServer::start().await;

        let config = test_config(&supabase.uri(), &openai.uri(), mode);
        let application = Application::build(config)
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", application.port());

        tokio::spawn(application.run_until_stopped());

        Self {
            address,
            supabase,
            openai,
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client()
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Router over the given doubles, for in-process tests.
pub fn mock_router(
    store: Arc<dyn CourseStore>,
    text_provider: Arc<dyn TextProvider>,
    mode: SearchMode,
) -> Router {
    let state = AppState {
        config: test_config("http://store.invalid", "http://openai.invalid", mode),
        store,
        text_provider,
        embedder: Arc::new(MockEmbeddingProvider::new(EMBEDDING_DIM)),
    };
    build_router(state)
}

/// Send one request through `router` and decode the JSON body.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub fn course(id: &str, title: &str) -> CourseRecord {
    CourseRecord::from_row(json!({
        "course_id": id,
        "title": title,
        "instructor": "Staff",
        "credits": 3
    }))
    .expect("valid row")
}

/// Rows as the store returns them for the "product management" query.
pub fn product_rows() -> Value {
    json!([
        {"course_id": "TO-567", "title": "Product Management", "instructor": "Lee", "credits": 3},
        {"course_id": "TO-620", "title": "Product Analytics", "instructor": "Kim", "credits": 3},
        {"course_id": "TO-101", "title": "Intro to Product Management", "instructor": "Park", "credits": 2},
        {"course_id": "TO-340", "title": "Product Management for Engineers", "instructor": "Diaz", "credits": 3},
        {"course_id": "TO-712", "title": "Advanced Product Management", "instructor": "Lee", "credits": 4}
    ])
}

pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 200, "completion_tokens": 60, "total_tokens": 260}
    })
}
