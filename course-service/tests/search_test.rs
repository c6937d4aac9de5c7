//! `/search` end to end against a wiremock store, plus in-process checks
//! over the mock store.

mod common;

use common::{course, json_request, mock_router, product_rows, send, TestApp, EMBEDDING_DIM};
use axum::http::StatusCode;
use course_service::config::SearchMode;
use course_service::services::providers::mock::MockTextProvider;
use course_service::services::store::mock::{MockCourseStore, MockLookup, MockStoreBehavior};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn search_returns_store_rows_in_order() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .and(query_param("title", "ilike.*product management*"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_rows()))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app
        .post_json("/search", &json!({"query": "product management", "k": 5}))
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    let ids: Vec<&str> = body["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|r| r["course_id"].as_str().expect("course_id"))
        .collect();
    assert_eq!(ids, vec!["TO-567", "TO-620", "TO-101", "TO-340", "TO-712"]);
    assert_eq!(body["results"][0]["metadata"]["instructor"], "Lee");
    assert!(body["took_ms"].as_u64().is_some());
}

#[tokio::test]
async fn filters_are_forwarded() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .and(query_param("instructor", "eq.Lee"))
        .and(query_param("credits", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app
        .post_json(
            "/search",
            &json!({"query": "product", "filters": {"instructor": "Lee", "credits": 3}}),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_the_store() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&app.supabase)
        .await;

    let cases = [
        json!({}),
        json!({"query": "   "}),
        json!({"query": 42}),
        json!({"query": "x", "k": 0}),
        json!({"query": "x", "k": 26}),
        json!({"query": "x", "k": "five"}),
        json!({"query": "x", "filters": ["credits"]}),
        json!({"query": "x", "filters": {"credits": {"gt": 3}}}),
        json!({"query": "x", "filters": {"limit": 100}}),
    ];

    for case in cases {
        let response = app.post_json("/search", &case).await;
        assert_eq!(response.status(), 400, "payload {} should be rejected", case);
        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .post(format!("{}/search", app.address))
        .header("content-type", "text/plain")
        .body("query=product")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Request body must be JSON");
}

#[tokio::test]
async fn store_timeout_is_service_unavailable() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_rows())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&app.supabase)
        .await;

    let response = app.post_json("/search", &json!({"query": "product"})).await;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "upstream_error");
}

#[tokio::test]
async fn store_error_is_bad_gateway_without_details() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relation \"courses\" does not exist"))
        .mount(&app.supabase)
        .await;

    let response = app.post_json("/search", &json!({"query": "product"})).await;

    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "upstream_error");
    assert!(!body["message"].as_str().unwrap_or_default().contains("relation"));
}

#[tokio::test]
async fn malformed_store_rows_are_bad_gateway() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"title": "No id"}])))
        .mount(&app.supabase)
        .await;

    let response = app.post_json("/search", &json!({"query": "product"})).await;

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn semantic_mode_embeds_then_calls_match_function() {
    let app = TestApp::spawn_with_mode(SearchMode::Semantic).await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["data visualization"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3, 0.4]}]
        })))
        .expect(1)
        .mount(&app.openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_courses"))
        .and(body_partial_json(json!({"match_count": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"course_id": "DS-210", "title": "Data Visualization", "distance": 0.12}
        ])))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app
        .post_json("/search", &json!({"query": "data visualization", "k": 3}))
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["results"][0]["course_id"], "DS-210");
}

#[tokio::test]
async fn semantic_mode_rejects_wrong_embedding_size() {
    let app = TestApp::spawn_with_mode(SearchMode::Semantic).await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2]}]
        })))
        .mount(&app.openai)
        .await;

    let response = app.post_json("/search", &json!({"query": "data"})).await;

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn default_k_and_filters_reach_the_store() {
    let store = Arc::new(MockCourseStore::with_rows(vec![course("TO-1", "One")]));
    let router = mock_router(
        store.clone(),
        Arc::new(MockTextProvider::replying("[]")),
        SearchMode::Title,
    );

    let (status, body) = send(
        router,
        json_request(
            "/search",
            &json!({"query": "  product  ", "filters": {"active": true}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["course_id"], "TO-1");
    match store.last_lookup() {
        Some(MockLookup::Title { query, limit, filters }) => {
            assert_eq!(query, "product");
            assert_eq!(limit, 10);
            assert_eq!(filters.len(), 1);
        }
        other => panic!("unexpected lookup: {:?}", other),
    }
}

#[tokio::test]
async fn semantic_lookup_uses_configured_dimension() {
    let store = Arc::new(MockCourseStore::with_rows(vec![]));
    let router = mock_router(
        store.clone(),
        Arc::new(MockTextProvider::replying("[]")),
        SearchMode::Semantic,
    );

    let long_query = "a".repeat(2_000);
    let (status, _) = send(router, json_request("/search", &json!({"query": long_query, "k": 2}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        store.last_lookup(),
        Some(MockLookup::Embedding {
            dims: EMBEDDING_DIM,
            limit: 2
        })
    );
}

#[tokio::test]
async fn unreachable_store_is_bad_gateway() {
    let store = Arc::new(MockCourseStore::new(MockStoreBehavior::Unavailable));
    let router = mock_router(
        store.clone(),
        Arc::new(MockTextProvider::replying("[]")),
        SearchMode::Title,
    );

    let (status, body) = send(router, json_request("/search", &json!({"query": "x"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(store.calls(), 1);
}
