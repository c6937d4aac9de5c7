//! Supabase (PostgREST) course store.
//!
//! Title search reads the course table directly; vector search calls a
//! Postgres function through the RPC endpoint. Filters become
//! `column=eq.value` query parameters in both cases.

use super::{shape_rows, CourseStore, Filters, StoreError};
use crate::config::SupabaseConfig;
use crate::dtos::FilterValue;
use crate::models::CourseRecord;
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::{Duration, Instant};

pub struct SupabaseStore {
    config: SupabaseConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MatchCoursesParams<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        if config.url.is_empty() || config.api_key.is_empty() {
            return Err(StoreError::NotConfigured(
                "SUPABASE_URL and an API key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(5)))
            .build()
            .map_err(|e| StoreError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response, StoreError> {
        let start = Instant::now();
        let result = self.authorized(builder).send().await;
        histogram!("course_store_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                counter!("course_store_requests_total", "operation" => operation, "outcome" => "error")
                    .increment(1);
                return Err(StoreError::from(e));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            counter!("course_store_requests_total", "operation" => operation, "outcome" => "error")
                .increment(1);
            return Err(StoreError::ApiError { status, message });
        }

        counter!("course_store_requests_total", "operation" => operation, "outcome" => "ok")
            .increment(1);
        Ok(response)
    }
}

/// PostgREST operator syntax for an equality filter.
fn filter_param(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(s) => format!("eq.{}", s),
        FilterValue::Number(n) => format!("eq.{}", n),
        FilterValue::Bool(b) => format!("is.{}", b),
        FilterValue::Null => "is.null".to_string(),
    }
}

fn filter_params(filters: &Filters) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|(column, value)| (column.clone(), filter_param(value)))
        .collect()
}

#[async_trait]
impl CourseStore for SupabaseStore {
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
        filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError> {
        let mut params = vec![
            ("select".to_string(), self.config.select.clone()),
            ("title".to_string(), format!("ilike.*{}*", query)),
            ("limit".to_string(), limit.to_string()),
        ];
        params.extend(filter_params(filters));

        tracing::debug!(
            table = %self.config.table,
            limit,
            filter_count = filters.len(),
            "Querying course store by title"
        );

        let response = self
            .send(
                "search_by_title",
                self.client.get(self.rest_url(&self.config.table)).query(&params),
            )
            .await?;

        let payload: serde_json::Value = response.json().await?;
        shape_rows(payload, limit)
    }

    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError> {
        let mut params = filter_params(filters);
        params.push(("limit".to_string(), limit.to_string()));

        tracing::debug!(
            function = %self.config.match_function,
            dims = embedding.len(),
            limit,
            "Calling course match function"
        );

        let body = MatchCoursesParams {
            query_embedding: embedding,
            match_count: limit,
        };
        let url = self.rest_url(&format!("rpc/{}", self.config.match_function));

        let response = self
            .send(
                "match_by_embedding",
                self.client.post(url).query(&params).json(&body),
            )
            .await?;

        let payload: serde_json::Value = response.json().await?;
        shape_rows(payload, limit)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let response = self
            .send(
                "health_check",
                self.client
                    .get(self.rest_url(&self.config.table))
                    .query(&[("select", "course_id"), ("limit", "1")]),
            )
            .await?;

        // Body must still be a row array; an HTML error page is not healthy.
        let payload: serde_json::Value = response.json().await?;
        if payload.is_array() {
            Ok(())
        } else {
            Err(StoreError::Malformed("expected a JSON array of rows".to_string()))
        }
    }
}
