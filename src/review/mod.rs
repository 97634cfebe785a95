//! Spaced repetition for passed exercises
//!
//! This module provides:
//! - One review card per exercise that has ever been passed
//! - A forgetting-curve scheduler (New -> Learning -> Review <-> Relearning)
//! - Due-card queries for review sessions

pub mod algorithm;
pub mod due;
pub mod models;

pub use algorithm::{format_interval, Scheduler, SchedulerError};
pub use due::DueReviewQuery;
pub use models::*;
