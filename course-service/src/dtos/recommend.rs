use crate::models::Recommendation;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Most candidates a single prompt may carry.
pub const MAX_CANDIDATES: usize = 50;

#[derive(Debug, Deserialize, Validate)]
pub struct RecommendRequest {
    #[serde(deserialize_with = "super::trimmed_string")]
    #[validate(length(min = 1, message = "Missing or invalid 'query' field"))]
    pub query: String,

    #[validate(
        length(min = 1, max = 50, message = "'results' must hold 1-50 courses"),
        nested
    )]
    pub results: Vec<CandidateCourse>,

    #[serde(default)]
    #[validate(range(min = 1, message = "Invalid 'top_k' value (must be positive)"))]
    pub top_k: Option<i64>,
}

impl RecommendRequest {
    /// Requested count clamped to the candidate count; when absent, the
    /// candidate count capped at `cap`.
    pub fn effective_top_k(&self, cap: usize) -> usize {
        let available = self.results.len();
        match self.top_k {
            Some(k) if k > 0 => (k as usize).min(available),
            _ => available.min(cap),
        }
    }
}

/// A course stub as sent by the caller, usually echoed from `/search`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CandidateCourse {
    #[serde(deserialize_with = "id_string")]
    #[validate(length(min = 1, message = "Missing 'course_id'"))]
    pub course_id: String,

    pub title: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept string or numeric ids; anything else is a type error.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "course_id must be a string, got {}",
            other
        ))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub took_ms: u64,
}
