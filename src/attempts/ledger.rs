//! Ledger queries layered over any attempt repository

use std::collections::BTreeMap;

use crate::storage::{AttemptRepository, Result};

use super::models::Attempt;

/// Ledger operations available on every [`AttemptRepository`].
///
/// The ledger never validates attempts against the exercise index; even a
/// failing attempt for unknown content is valid history.
pub trait AttemptLedger: AttemptRepository {
    /// Durably append an attempt
    fn record(&mut self, attempt: &Attempt) -> Result<()> {
        log::debug!(
            "Recording {} attempt on {} (success={})",
            attempt.exercise_type,
            attempt.exercise_id,
            attempt.success
        );
        self.append_attempt(attempt)
    }

    /// Whether each attempted exercise of a lesson has ever been passed
    fn best_outcomes_by_lesson(&self, lesson_id: &str) -> Result<BTreeMap<String, bool>> {
        let mut outcomes = BTreeMap::new();
        for attempt in self.attempts_for_lesson(lesson_id)? {
            let passed = outcomes.entry(attempt.exercise_id).or_insert(false);
            *passed |= attempt.success;
        }
        Ok(outcomes)
    }

    /// Every attempt for an exercise, most recent last
    fn history(&self, exercise_id: &str) -> Result<Vec<Attempt>> {
        self.attempts_for_exercise(exercise_id)
    }

    fn latest_attempt(&self, exercise_id: &str) -> Result<Option<Attempt>> {
        Ok(self.attempts_for_exercise(exercise_id)?.pop())
    }

    fn pass_count(&self, exercise_id: &str) -> Result<usize> {
        Ok(self
            .attempts_for_exercise(exercise_id)?
            .iter()
            .filter(|a| a.success)
            .count())
    }
}

impl<T: AttemptRepository + ?Sized> AttemptLedger for T {}
