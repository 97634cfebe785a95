//! Per-concept mastery levels

pub mod models;
pub mod tracker;

pub use models::*;
pub use tracker::MasteryTracker;
