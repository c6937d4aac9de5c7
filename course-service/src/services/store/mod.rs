//! Course store abstraction.
//!
//! The store is an external, opaque service: this crate sends a query, a row
//! limit and equality filters, and gets ordered course rows back.

pub mod mock;
pub mod supabase;

pub use supabase::SupabaseStore;

use crate::dtos::FilterValue;
use crate::models::CourseRecord;
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::BTreeMap;
use thiserror::Error;

pub type Filters = BTreeMap<String, FilterValue>;

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("Store request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Store returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed store response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Malformed(err.to_string())
        } else {
            StoreError::NetworkError(err.to_string())
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(error = %err, "Course store call failed");
        match err {
            StoreError::Timeout => AppError::ServiceUnavailable("Course store timed out".to_string()),
            StoreError::ApiError { status, .. } if status == 429 || status == 503 => {
                AppError::ServiceUnavailable("Course store is unavailable".to_string())
            }
            StoreError::NotConfigured(_) => {
                AppError::ServiceUnavailable("Course store is not configured".to_string())
            }
            StoreError::Malformed(_) => {
                AppError::BadGateway("Course store returned an invalid response".to_string())
            }
            StoreError::NetworkError(_) | StoreError::ApiError { .. } => {
                AppError::BadGateway("Course store request failed".to_string())
            }
        }
    }
}

/// Trait for course record stores (e.g., Supabase).
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Up to `limit` courses whose title contains `query`, case-insensitively,
    /// in store order.
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
        filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError>;

    /// Up to `limit` courses nearest to `embedding`, closest first.
    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError>;

    /// Cheap one-row read proving the store answers.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Shape a raw store payload into course records, keeping store order.
pub(crate) fn shape_rows(
    payload: serde_json::Value,
    limit: usize,
) -> Result<Vec<CourseRecord>, StoreError> {
    let serde_json::Value::Array(rows) = payload else {
        return Err(StoreError::Malformed("expected a JSON array of rows".to_string()));
    };

    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, row)| {
            CourseRecord::from_row(row).map_err(|e| StoreError::Malformed(format!("row {}: {}", i, e)))
        })
        .collect()
}
