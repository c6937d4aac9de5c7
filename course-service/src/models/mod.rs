//! Domain models for the course service.

pub mod course;
pub mod recommendation;

pub use course::CourseRecord;
pub use recommendation::Recommendation;
