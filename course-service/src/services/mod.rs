pub mod metrics;
pub mod providers;
pub mod recommender;
pub mod store;

pub use metrics::{get_metrics, init_metrics};
pub use store::{CourseStore, SupabaseStore};
