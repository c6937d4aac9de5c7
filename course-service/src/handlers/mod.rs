pub mod health;
pub mod metrics;
pub mod recommend;
pub mod search;

pub use health::{health_check, readiness_check};
pub use recommend::recommend_courses;
pub use search::search_courses;

use service_core::error::AppError;

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Route not found"))
}
