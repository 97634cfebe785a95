//! Lesson and module completion

pub mod aggregator;
pub mod models;

pub use aggregator::{module_progress, LessonAggregator};
pub use models::*;
