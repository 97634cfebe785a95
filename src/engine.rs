//! Practice engine
//!
//! Owns a progress store, the content index and the scheduler, and turns a
//! submitted attempt into every derived update. A submission writes the
//! ledger first, then the review card and concept mastery, then lesson
//! progress, all inside one store transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::attempts::{Attempt, AttemptLedger};
use crate::content::ExerciseIndex;
use crate::mastery::{MasteryLevel, MasteryTracker};
use crate::progress::{
    self, CompletionStatus, LessonAggregator, LessonProgressRecord, ModuleProgress,
};
use crate::review::algorithm::validate_card;
use crate::review::{DueReviewQuery, Rating, ReviewCard, ReviewStats, Scheduler, SchedulerError};
use crate::storage::{self, ProgressStore, Snapshot, StorageError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("No review card for exercise {0}")]
    CardNotFound(String),
    #[error("Exercise {0} has never been passed")]
    NoPassingAttempt(String),
    #[error("Review card for {0} is due before its last review")]
    DueBeforeLastReview(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything a single submission changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub attempt_id: Uuid,
    /// The rescheduled card, present only for passing attempts
    pub card: Option<ReviewCard>,
    /// Concepts whose level rose because of this attempt
    pub concepts_advanced: Vec<String>,
    /// Lesson status, absent when the exercise is not in the index
    pub completion: Option<CompletionStatus>,
}

pub struct PracticeEngine<S, I> {
    store: S,
    index: I,
    scheduler: Scheduler,
}

impl<S: ProgressStore, I: ExerciseIndex> PracticeEngine<S, I> {
    pub fn new(store: S, index: I, scheduler: Scheduler) -> Self {
        Self {
            store,
            index,
            scheduler,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Record an attempt and apply its consequences.
    ///
    /// A pass schedules the exercise as if rated `Good` and raises its tagged
    /// concepts to `learning`. Attempts on exercises missing from the index
    /// are still recorded, but mastery and lesson progress are left alone.
    pub fn submit(&mut self, attempt: Attempt) -> Result<SubmissionOutcome> {
        let index = &self.index;
        let scheduler = &self.scheduler;
        let now = attempt.attempted_at;

        self.store.atomically(|store| -> Result<SubmissionOutcome> {
            store.record(&attempt)?;

            let mut outcome = SubmissionOutcome {
                attempt_id: attempt.id,
                card: None,
                concepts_advanced: Vec::new(),
                completion: None,
            };

            if attempt.success {
                let card = store
                    .get_card(&attempt.exercise_id)?
                    .unwrap_or_else(|| ReviewCard::new(&attempt.exercise_id, now));
                let next = scheduler.review(&card, Rating::Good, now)?;
                store.upsert_card(&next)?;
                outcome.card = Some(next);
            }

            let Some(entry) = index.lookup(&attempt.exercise_id) else {
                log::warn!(
                    "Exercise {} is not in the content index; skipping mastery and lesson progress",
                    attempt.exercise_id
                );
                return Ok(outcome);
            };
            if entry.lesson_id != attempt.lesson_id {
                log::warn!(
                    "Attempt on {} names lesson {} but the index places it in {}",
                    attempt.exercise_id,
                    attempt.lesson_id,
                    entry.lesson_id
                );
            }

            if attempt.success {
                for concept in &entry.concept_tags {
                    if store.raise_to(concept, MasteryLevel::Learning, now)? {
                        outcome.concepts_advanced.push(concept.clone());
                    }
                }
            }

            let mut aggregator = LessonAggregator::new(store, index);
            aggregator.touch(&entry.lesson_id, &entry.module_id, now)?;
            let completion = aggregator.check_completion(&entry.lesson_id, now)?;
            if completion.newly_completed {
                for concept in &entry.concept_tags {
                    if !outcome.concepts_advanced.contains(concept) {
                        outcome.concepts_advanced.push(concept.clone());
                    }
                }
            }
            outcome.completion = Some(completion);

            Ok(outcome)
        })
    }

    /// Self-graded review of an exercise that already has a card
    pub fn review_exercise(
        &mut self,
        exercise_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ReviewCard> {
        let scheduler = &self.scheduler;
        self.store.atomically(|store| -> Result<ReviewCard> {
            let card = store
                .get_card(exercise_id)?
                .ok_or_else(|| EngineError::CardNotFound(exercise_id.to_string()))?;
            let next = scheduler.review(&card, rating, now)?;
            store.upsert_card(&next)?;
            Ok(next)
        })
    }

    /// Store a card computed elsewhere, after checking it could have been
    /// produced by the review flow
    pub fn upsert_review_card(&mut self, card: &ReviewCard) -> Result<()> {
        validate_card(card)?;
        if card.due < card.anchor() {
            return Err(EngineError::DueBeforeLastReview(card.exercise_id.clone()));
        }
        self.store.atomically(|store| -> Result<()> {
            if store.pass_count(&card.exercise_id)? == 0 {
                return Err(EngineError::NoPassingAttempt(card.exercise_id.clone()));
            }
            store.upsert_card(card)?;
            Ok(())
        })
    }

    pub fn set_mastery(
        &mut self,
        concept: &str,
        level: MasteryLevel,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store.set_level(concept, level, now)?;
        Ok(())
    }

    pub fn check_completion(
        &mut self,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletionStatus> {
        let index = &self.index;
        Ok(LessonAggregator::new(&mut self.store, index).check_completion(lesson_id, now)?)
    }

    pub fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<ReviewCard>> {
        Ok(self.store.due_cards(now)?)
    }

    pub fn review_stats(&self, now: DateTime<Utc>) -> Result<ReviewStats> {
        Ok(self.store.review_stats(now)?)
    }

    pub fn lesson_progress(&self, lesson_id: &str) -> Result<Option<LessonProgressRecord>> {
        Ok(self.store.get_lesson_progress(lesson_id)?)
    }

    pub fn all_lesson_progress(&self) -> Result<Vec<LessonProgressRecord>> {
        Ok(self.store.list_lesson_progress()?)
    }

    pub fn module_progress(&self, module_id: &str) -> Result<ModuleProgress> {
        Ok(progress::module_progress(&self.store, &self.index, module_id)?)
    }

    pub fn concept_mastery(&self) -> Result<BTreeMap<String, MasteryLevel>> {
        Ok(self.store.all_levels()?)
    }

    pub fn history(&self, exercise_id: &str) -> Result<Vec<Attempt>> {
        Ok(self.store.history(exercise_id)?)
    }

    pub fn best_outcomes(&self, lesson_id: &str) -> Result<BTreeMap<String, bool>> {
        Ok(self.store.best_outcomes_by_lesson(lesson_id)?)
    }

    pub fn export_snapshot(&self, now: DateTime<Utc>) -> Result<Snapshot> {
        Ok(storage::export_snapshot(&self.store, now)?)
    }

    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        Ok(storage::import_snapshot(&mut self.store, snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempts::ExerciseType;
    use crate::content::{ExerciseIndexEntry, StaticExerciseIndex};
    use crate::review::CardStatus;
    use crate::storage::{
        AttemptRepository, MemoryStore, ReviewCardRepository, SqliteStore, Table,
    };
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
    }

    fn index() -> StaticExerciseIndex {
        StaticExerciseIndex::from_entries(vec![
            ExerciseIndexEntry::new("E1", "M1", "L1", &["loops", "conditionals"]),
            ExerciseIndexEntry::new("E2", "M1", "L2", &["lists"]),
            ExerciseIndexEntry::new("E3", "M1", "L2", &["lists", "slicing"]),
        ])
        .unwrap()
    }

    fn create_test_engine() -> PracticeEngine<MemoryStore, StaticExerciseIndex> {
        PracticeEngine::new(MemoryStore::new(), index(), Scheduler::default())
    }

    fn attempt(exercise: &str, lesson: &str, success: bool, at: DateTime<Utc>) -> Attempt {
        Attempt::new(exercise, lesson, "M1", ExerciseType::Trace, success, at)
    }

    #[test]
    fn test_fail_then_pass_completes_single_exercise_lesson() {
        let mut engine = create_test_engine();

        let failed = engine.submit(attempt("E1", "L1", false, t0())).unwrap();
        assert!(failed.card.is_none());
        assert!(failed.concepts_advanced.is_empty());
        assert_eq!(failed.completion, Some(CompletionStatus::default()));
        assert_eq!(
            engine.best_outcomes("L1").unwrap(),
            BTreeMap::from([("E1".to_string(), false)])
        );

        let passed = engine
            .submit(attempt("E1", "L1", true, t0() + Duration::minutes(5)))
            .unwrap();
        let card = passed.card.unwrap();
        assert_eq!(card.state, CardStatus::Learning);
        assert_eq!(card.reps, 1);
        assert_eq!(card.lapses, 0);

        let completion = passed.completion.unwrap();
        assert!(completion.completed);
        assert!(completion.newly_completed);
        assert!(engine.lesson_progress("L1").unwrap().unwrap().completed);

        let mastery = engine.concept_mastery().unwrap();
        assert_eq!(mastery["loops"], MasteryLevel::Proficient);
        assert_eq!(mastery["conditionals"], MasteryLevel::Proficient);
        assert_eq!(passed.concepts_advanced, vec!["loops", "conditionals"]);
    }

    #[test]
    fn test_completion_is_reported_once() {
        let mut engine = create_test_engine();
        engine.submit(attempt("E1", "L1", true, t0())).unwrap();

        let again = engine
            .submit(attempt("E1", "L1", true, t0() + Duration::days(1)))
            .unwrap();
        let completion = again.completion.unwrap();
        assert!(completion.completed);
        assert!(!completion.newly_completed);
        assert!(again.concepts_advanced.is_empty());
        assert_eq!(again.card.unwrap().reps, 2);
    }

    #[test]
    fn test_pass_raises_concepts_to_learning_until_lesson_completes() {
        let mut engine = create_test_engine();
        let outcome = engine.submit(attempt("E2", "L2", true, t0())).unwrap();

        assert_eq!(outcome.completion, Some(CompletionStatus::default()));
        assert_eq!(outcome.concepts_advanced, vec!["lists"]);
        assert_eq!(engine.concept_mastery().unwrap()["lists"], MasteryLevel::Learning);

        let record = engine.lesson_progress("L2").unwrap().unwrap();
        assert!(!record.completed);
        assert_eq!(record.module_id, "M1");

        let module = engine.module_progress("M1").unwrap();
        assert_eq!(module.lessons_total, 2);
        assert_eq!(module.lessons_completed, 0);
    }

    #[test]
    fn test_unknown_exercise_is_recorded_only() {
        let mut engine = create_test_engine();
        let outcome = engine.submit(attempt("X9", "L1", true, t0())).unwrap();

        assert!(outcome.card.is_some());
        assert!(outcome.completion.is_none());
        assert_eq!(engine.history("X9").unwrap().len(), 1);
        assert!(engine.concept_mastery().unwrap().is_empty());
        assert!(engine.all_lesson_progress().unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back_whole_submission() {
        let mut store = MemoryStore::new();
        store.fail_writes_to(Table::LessonProgress);
        let mut engine = PracticeEngine::new(store, index(), Scheduler::default());

        let result = engine.submit(attempt("E1", "L1", true, t0()));
        assert!(matches!(result, Err(EngineError::Storage(_))));
        assert!(engine.store().list_attempts().unwrap().is_empty());
        assert!(engine.due_cards(t0() + Duration::days(30)).unwrap().is_empty());
        assert!(engine.concept_mastery().unwrap().is_empty());
    }

    #[test]
    fn test_lapse_after_review_keeps_mastery() {
        let mut engine = create_test_engine();
        engine.submit(attempt("E1", "L1", true, t0())).unwrap();
        let before = engine.store().get_card("E1").unwrap().unwrap();

        let lapsed = engine
            .review_exercise("E1", Rating::Again, t0() + Duration::days(2))
            .unwrap();
        assert_eq!(lapsed.lapses, before.lapses + 1);
        assert!(lapsed.stability < before.stability);
        assert_eq!(engine.concept_mastery().unwrap()["loops"], MasteryLevel::Proficient);
    }

    #[test]
    fn test_review_requires_existing_card() {
        let mut engine = create_test_engine();
        assert!(matches!(
            engine.review_exercise("E1", Rating::Good, t0()),
            Err(EngineError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_upsert_review_card_validation() {
        let mut engine = create_test_engine();
        let card = ReviewCard::new("E2", t0());
        assert!(matches!(
            engine.upsert_review_card(&card),
            Err(EngineError::NoPassingAttempt(_))
        ));

        engine.submit(attempt("E2", "L2", true, t0())).unwrap();
        let mut skewed = engine.store().get_card("E2").unwrap().unwrap();
        skewed.due = t0() - Duration::days(1);
        assert!(matches!(
            engine.upsert_review_card(&skewed),
            Err(EngineError::DueBeforeLastReview(_))
        ));

        skewed.due = t0() + Duration::days(10);
        engine.upsert_review_card(&skewed).unwrap();
        assert_eq!(engine.store().get_card("E2").unwrap().unwrap(), skewed);
    }

    #[test]
    fn test_upsert_rejects_cards_the_scheduler_could_not_produce() {
        let mut engine = create_test_engine();
        let card = engine.submit(attempt("E2", "L2", true, t0())).unwrap().card.unwrap();

        let mut negative = card.clone();
        negative.stability = -1.0;
        let mut too_hard = card.clone();
        too_hard.difficulty = 12.0;
        let mut reviewed_new = card.clone();
        reviewed_new.state = CardStatus::New;

        for bad in [negative, too_hard, reviewed_new] {
            assert!(matches!(
                engine.upsert_review_card(&bad),
                Err(EngineError::Scheduler(SchedulerError::InvalidCard { .. }))
            ));
        }
        assert_eq!(engine.store().get_card("E2").unwrap().unwrap(), card);
    }

    #[test]
    fn test_pass_under_stale_lesson_completes_indexed_lesson() {
        let mut engine = create_test_engine();
        let outcome = engine.submit(attempt("E1", "L-stale", true, t0())).unwrap();

        let completion = outcome.completion.unwrap();
        assert!(completion.newly_completed);
        assert!(engine.lesson_progress("L1").unwrap().unwrap().completed);
        assert!(engine.lesson_progress("L-stale").unwrap().is_none());
        assert_eq!(engine.concept_mastery().unwrap()["loops"], MasteryLevel::Proficient);
    }

    #[test]
    fn test_due_cards_follow_schedule() {
        let mut engine = create_test_engine();
        let card = engine.submit(attempt("E2", "L2", true, t0())).unwrap().card.unwrap();

        assert!(engine.due_cards(t0()).unwrap().is_empty());
        let due = engine.due_cards(card.due + Duration::hours(1)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].exercise_id, "E2");

        let stats = engine.review_stats(card.due).unwrap();
        assert_eq!(stats.total_cards, 1);
        assert_eq!(stats.learning_cards, 1);
        assert_eq!(stats.due_cards, 1);
    }

    #[test]
    fn test_sqlite_engine_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("progress.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            let mut engine = PracticeEngine::new(store, index(), Scheduler::default());
            engine.submit(attempt("E2", "L2", true, t0())).unwrap();
            engine
                .submit(attempt("E3", "L2", true, t0() + Duration::minutes(3)))
                .unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        let engine = PracticeEngine::new(store, index(), Scheduler::default());
        assert!(engine.lesson_progress("L2").unwrap().unwrap().completed);
        assert!(engine.module_progress("M1").unwrap().lessons_completed == 1);
        assert_eq!(engine.concept_mastery().unwrap()["slicing"], MasteryLevel::Proficient);
        assert_eq!(engine.export_snapshot(t0()).unwrap().attempts.len(), 2);
    }
}
