use std::collections::BTreeMap;
use std::sync::MutexGuard;

use chrono::Utc;

use crate::attempts::{Attempt, ExerciseType};
use crate::engine::{EngineError, SubmissionOutcome};
use crate::errors::ParseValueError;
use crate::mastery::MasteryLevel;
use crate::progress::{LessonProgressRecord, ModuleProgress};
use crate::review::SchedulerError;
use crate::storage::Snapshot;
use crate::{AppState, Engine};

#[derive(Debug, serde::Serialize)]
pub struct CommandError {
    pub message: String,
}

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<SchedulerError> for CommandError {
    fn from(err: SchedulerError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<ParseValueError> for CommandError {
    fn from(err: ParseValueError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

pub(super) type CommandResult<T> = Result<T, CommandError>;

pub(super) fn lock_engine(state: &AppState) -> CommandResult<MutexGuard<'_, Engine>> {
    state.engine.lock().map_err(|_| CommandError {
        message: "Progress store is unavailable after an earlier failure".to_string(),
    })
}

/// Record a submission and apply its review, mastery and lesson updates
#[allow(clippy::too_many_arguments)]
pub fn record_attempt(
    state: &AppState,
    exercise_id: String,
    lesson_id: String,
    module_id: String,
    exercise_type: String,
    success: bool,
    time_spent_ms: Option<u64>,
    submitted_code: Option<String>,
) -> CommandResult<SubmissionOutcome> {
    let exercise_type: ExerciseType = exercise_type.parse()?;
    let mut attempt = Attempt::new(
        exercise_id,
        lesson_id,
        module_id,
        exercise_type,
        success,
        Utc::now(),
    )
    .with_time_spent(time_spent_ms.unwrap_or(0));
    attempt.submitted_code = submitted_code;

    let mut engine = lock_engine(state)?;
    engine.submit(attempt).map_err(Into::into)
}

/// Set a concept's mastery level explicitly
pub fn update_mastery(state: &AppState, concept: String, level: String) -> CommandResult<()> {
    let level: MasteryLevel = level.parse()?;
    let mut engine = lock_engine(state)?;
    engine
        .set_mastery(&concept, level, Utc::now())
        .map_err(Into::into)
}

pub fn get_concept_mastery(state: &AppState) -> CommandResult<BTreeMap<String, MasteryLevel>> {
    let engine = lock_engine(state)?;
    engine.concept_mastery().map_err(Into::into)
}

pub fn get_lesson_progress(
    state: &AppState,
    lesson_id: String,
) -> CommandResult<Option<LessonProgressRecord>> {
    let engine = lock_engine(state)?;
    engine.lesson_progress(&lesson_id).map_err(Into::into)
}

pub fn get_all_lesson_progress(state: &AppState) -> CommandResult<Vec<LessonProgressRecord>> {
    let engine = lock_engine(state)?;
    engine.all_lesson_progress().map_err(Into::into)
}

pub fn get_module_progress(state: &AppState, module_id: String) -> CommandResult<ModuleProgress> {
    let engine = lock_engine(state)?;
    engine.module_progress(&module_id).map_err(Into::into)
}

/// Dump every progress table for backup
pub fn export_snapshot(state: &AppState) -> CommandResult<Snapshot> {
    let engine = lock_engine(state)?;
    engine.export_snapshot(Utc::now()).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ExerciseIndexEntry, StaticExerciseIndex};
    use crate::engine::PracticeEngine;
    use crate::review::Scheduler;
    use crate::storage::SqliteStore;

    fn create_test_state() -> AppState {
        let index = StaticExerciseIndex::from_entries(vec![
            ExerciseIndexEntry::new("ex-1", "basics", "variables", &["assignment"]),
            ExerciseIndexEntry::new("ex-2", "basics", "loops", &["for-loops"]),
        ])
        .unwrap();
        let store = SqliteStore::open_in_memory().unwrap();
        AppState::new(PracticeEngine::new(store, index, Scheduler::default()))
    }

    #[test]
    fn test_record_attempt_parses_exercise_type() {
        let state = create_test_state();
        let outcome = record_attempt(
            &state,
            "ex-1".to_string(),
            "variables".to_string(),
            "basics".to_string(),
            "fill-in".to_string(),
            true,
            Some(4200),
            Some("x = 1".to_string()),
        )
        .unwrap();
        assert!(outcome.completion.unwrap().newly_completed);

        let progress = get_lesson_progress(&state, "variables".to_string())
            .unwrap()
            .unwrap();
        assert!(progress.completed);

        let snapshot = export_snapshot(&state).unwrap();
        assert_eq!(snapshot.attempts[0].time_spent_ms, 4200);
        assert_eq!(snapshot.attempts[0].exercise_type, ExerciseType::FillIn);
    }

    #[test]
    fn test_invalid_input_becomes_command_error() {
        let state = create_test_state();
        let err = record_attempt(
            &state,
            "ex-1".to_string(),
            "variables".to_string(),
            "basics".to_string(),
            "essay".to_string(),
            true,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.message.contains("essay"));

        let err = update_mastery(&state, "loops".to_string(), "expert".to_string()).unwrap_err();
        assert!(err.message.contains("expert"));
        assert!(get_all_lesson_progress(&state).unwrap().is_empty());
    }

    #[test]
    fn test_update_mastery_and_module_progress() {
        let state = create_test_state();
        update_mastery(&state, "for-loops".to_string(), "mastered".to_string()).unwrap();
        assert_eq!(
            get_concept_mastery(&state).unwrap()["for-loops"],
            MasteryLevel::Mastered
        );

        let module = get_module_progress(&state, "basics".to_string()).unwrap();
        assert_eq!(module.lessons_total, 2);
        assert_eq!(module.lessons_completed, 0);
    }

    #[test]
    fn test_command_error_serializes_message() {
        let err = CommandError::from(ParseValueError::new("mastery level", "expert"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["message"], "Unknown mastery level: \"expert\"");
    }
}
