//! Repository traits over the four progress tables
//!
//! Each component depends only on the slice it needs, so the SQLite store and
//! the in-memory store are interchangeable.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::attempts::Attempt;
use crate::mastery::ConceptMasteryRecord;
use crate::progress::LessonProgressRecord;
use crate::review::ReviewCard;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Value cannot be stored: {0}")]
    InvalidValue(String),

    #[error("Store is not empty; refusing to import over existing progress")]
    NotEmpty,

    #[error("Invalid backup: {0}")]
    InvalidBackup(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Append-only attempt history
pub trait AttemptRepository {
    fn append_attempt(&mut self, attempt: &Attempt) -> Result<()>;

    /// Attempts for one exercise, oldest first
    fn attempts_for_exercise(&self, exercise_id: &str) -> Result<Vec<Attempt>>;

    /// Attempts for one lesson, oldest first
    fn attempts_for_lesson(&self, lesson_id: &str) -> Result<Vec<Attempt>>;

    fn list_attempts(&self) -> Result<Vec<Attempt>>;
}

pub trait MasteryRepository {
    fn get_mastery(&self, concept: &str) -> Result<Option<ConceptMasteryRecord>>;
    fn put_mastery(&mut self, record: &ConceptMasteryRecord) -> Result<()>;
    fn list_mastery(&self) -> Result<Vec<ConceptMasteryRecord>>;
}

pub trait ReviewCardRepository {
    fn get_card(&self, exercise_id: &str) -> Result<Option<ReviewCard>>;
    fn upsert_card(&mut self, card: &ReviewCard) -> Result<()>;

    /// Cards with `due <= now`, earliest first
    fn cards_due_by(&self, now: DateTime<Utc>) -> Result<Vec<ReviewCard>>;

    fn list_cards(&self) -> Result<Vec<ReviewCard>>;
}

pub trait LessonProgressRepository {
    fn get_lesson_progress(&self, lesson_id: &str) -> Result<Option<LessonProgressRecord>>;
    fn put_lesson_progress(&mut self, record: &LessonProgressRecord) -> Result<()>;
    fn list_lesson_progress(&self) -> Result<Vec<LessonProgressRecord>>;
}

/// Groups several writes into one all-or-nothing unit.
///
/// Nested calls join the outer transaction.
pub trait Transactional {
    fn atomically<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<StorageError>;
}

/// Everything the engine needs from a backing store
pub trait ProgressStore:
    AttemptRepository
    + MasteryRepository
    + ReviewCardRepository
    + LessonProgressRepository
    + Transactional
{
}

impl<T> ProgressStore for T where
    T: AttemptRepository
        + MasteryRepository
        + ReviewCardRepository
        + LessonProgressRepository
        + Transactional
{
}
