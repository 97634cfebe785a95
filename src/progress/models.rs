use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted completion state of a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressRecord {
    pub lesson_id: String,
    pub module_id: String,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgressRecord {
    pub fn started(
        lesson_id: impl Into<String>,
        module_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            module_id: module_id.into(),
            completed: false,
            updated_at: now,
        }
    }
}

/// Result of re-evaluating a lesson
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub completed: bool,
    /// True only on the call that flipped the lesson to completed
    pub newly_completed: bool,
}

/// Derived view over the lessons of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub module_id: String,
    pub lessons_total: usize,
    pub lessons_completed: usize,
    pub completed: bool,
}
