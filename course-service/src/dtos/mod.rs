pub mod recommend;
pub mod search;

pub use recommend::{CandidateCourse, RecommendRequest, RecommendResponse};
pub use search::{FilterValue, SearchRequest, SearchResponse};

use serde::{Deserialize, Deserializer};

/// Deserialize a string with surrounding whitespace removed, so that
/// `length(min = 1)` also rejects blank input.
pub(crate) fn trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}
