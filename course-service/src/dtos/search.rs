use crate::models::CourseRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

pub const DEFAULT_K: i64 = 10;
pub const MAX_K: i64 = 25;

/// Query parameters the store itself interprets; a filter column with one of
/// these names would rewrite the lookup instead of narrowing it.
const RESERVED_FILTER_KEYS: &[&str] = &[
    "select", "limit", "offset", "order", "or", "and", "not", "on_conflict", "columns",
];

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_filter_columns"))]
pub struct SearchRequest {
    #[serde(deserialize_with = "super::trimmed_string")]
    #[validate(length(min = 1, message = "Missing or invalid 'query' field"))]
    pub query: String,

    #[serde(default = "default_k")]
    #[validate(range(min = 1, max = 25, message = "Invalid 'k' value (must be 1-25)"))]
    pub k: i64,

    /// Passed to the store as equality filters, column by column.
    #[serde(default)]
    pub filters: Option<BTreeMap<String, FilterValue>>,
}

fn default_k() -> i64 {
    DEFAULT_K
}

impl SearchRequest {
    /// `k` after validation, as a row limit.
    pub fn limit(&self) -> usize {
        self.k.clamp(1, MAX_K) as usize
    }
}

/// A scalar filter value. Arrays and objects do not deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Null,
}

fn validate_filter_columns(request: &SearchRequest) -> Result<(), ValidationError> {
    let Some(filters) = &request.filters else {
        return Ok(());
    };

    for key in filters.keys() {
        if key.trim().is_empty() || RESERVED_FILTER_KEYS.contains(&key.as_str()) {
            let mut err = ValidationError::new("filters");
            err.message = Some(format!("Invalid filter key '{}'", key).into());
            return Err(err);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<CourseRecord>,
    pub took_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> SearchRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn k_defaults_to_ten() {
        let request = parse(json!({"query": "product management"}));
        assert_eq!(request.k, 10);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn query_is_trimmed_and_blank_rejected() {
        let request = parse(json!({"query": "  data  "}));
        assert_eq!(request.query, "data");

        let request = parse(json!({"query": "   "}));
        assert!(request.validate().is_err());
    }

    #[test]
    fn k_outside_range_is_rejected() {
        for k in [0, -3, 26, 1000] {
            let request = parse(json!({"query": "x", "k": k}));
            assert!(request.validate().is_err(), "k={} should be rejected", k);
        }
        for k in [1, 25] {
            let request = parse(json!({"query": "x", "k": k}));
            assert!(request.validate().is_ok(), "k={} should be accepted", k);
        }
    }

    #[test]
    fn filters_must_be_scalars() {
        let nested: Result<SearchRequest, _> =
            serde_json::from_value(json!({"query": "x", "filters": {"credits": {"gt": 3}}}));
        assert!(nested.is_err());

        let not_a_map: Result<SearchRequest, _> =
            serde_json::from_value(json!({"query": "x", "filters": ["credits"]}));
        assert!(not_a_map.is_err());

        let request = parse(json!({
            "query": "x",
            "filters": {"credits": 3, "instructor": "Lee", "online": true, "room": null}
        }));
        assert!(request.validate().is_ok());
        let filters = request.filters.unwrap();
        assert_eq!(filters["room"], FilterValue::Null);
        assert_eq!(filters["online"], FilterValue::Bool(true));
    }

    #[test]
    fn reserved_or_blank_filter_keys_are_rejected() {
        for key in ["limit", "select", "order", "", "  "] {
            let mut filters = serde_json::Map::new();
            filters.insert(key.to_string(), json!("1"));
            let request = parse(json!({"query": "x", "filters": filters}));
            assert!(request.validate().is_err(), "key '{}' should be rejected", key);
        }
    }

    #[test]
    fn other_filter_keys_pass_through() {
        for key in ["dept-code", "Course Level", "metadata->>term"] {
            let mut filters = serde_json::Map::new();
            filters.insert(key.to_string(), json!("1"));
            let request = parse(json!({"query": "x", "filters": filters}));
            assert!(request.validate().is_ok(), "key '{}' should be accepted", key);
        }
    }
}
