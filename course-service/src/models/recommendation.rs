use serde::{Deserialize, Serialize};

/// One validated recommendation. `course_id` always comes from the
/// candidate list sent by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub course_id: String,
    pub rationale: String,
    /// Clamped into `[0, 1]`.
    pub confidence: f64,
}
