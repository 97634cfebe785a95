//! In-memory store used by tests and short-lived sessions

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::attempts::Attempt;
use crate::mastery::ConceptMasteryRecord;
use crate::progress::LessonProgressRecord;
use crate::review::ReviewCard;

use super::repository::*;

/// Table names accepted by [`MemoryStore::fail_writes_to`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Table {
    Attempts,
    ConceptMastery,
    ReviewCards,
    LessonProgress,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    attempts: Vec<Attempt>,
    mastery: BTreeMap<String, ConceptMasteryRecord>,
    cards: BTreeMap<String, ReviewCard>,
    lessons: BTreeMap<String, LessonProgressRecord>,
    failing: BTreeSet<Table>,
    depth: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write to `table` fail with [`StorageError::Unavailable`]
    pub fn fail_writes_to(&mut self, table: Table) {
        self.failing.insert(table);
    }

    fn check_writable(&self, table: Table) -> Result<()> {
        if self.failing.contains(&table) {
            return Err(StorageError::Unavailable(format!("{:?} is not writable", table)));
        }
        Ok(())
    }
}

/// Stable sort keeps insertion order for attempts sharing a timestamp
fn chronological(mut attempts: Vec<Attempt>) -> Vec<Attempt> {
    attempts.sort_by_key(|a| a.attempted_at);
    attempts
}

impl AttemptRepository for MemoryStore {
    fn append_attempt(&mut self, attempt: &Attempt) -> Result<()> {
        self.check_writable(Table::Attempts)?;
        self.attempts.push(attempt.clone());
        Ok(())
    }

    fn attempts_for_exercise(&self, exercise_id: &str) -> Result<Vec<Attempt>> {
        Ok(chronological(
            self.attempts
                .iter()
                .filter(|a| a.exercise_id == exercise_id)
                .cloned()
                .collect(),
        ))
    }

    fn attempts_for_lesson(&self, lesson_id: &str) -> Result<Vec<Attempt>> {
        Ok(chronological(
            self.attempts
                .iter()
                .filter(|a| a.lesson_id == lesson_id)
                .cloned()
                .collect(),
        ))
    }

    fn list_attempts(&self) -> Result<Vec<Attempt>> {
        Ok(chronological(self.attempts.clone()))
    }
}

impl MasteryRepository for MemoryStore {
    fn get_mastery(&self, concept: &str) -> Result<Option<ConceptMasteryRecord>> {
        Ok(self.mastery.get(concept).cloned())
    }

    fn put_mastery(&mut self, record: &ConceptMasteryRecord) -> Result<()> {
        self.check_writable(Table::ConceptMastery)?;
        self.mastery.insert(record.concept.clone(), record.clone());
        Ok(())
    }

    fn list_mastery(&self) -> Result<Vec<ConceptMasteryRecord>> {
        Ok(self.mastery.values().cloned().collect())
    }
}

impl ReviewCardRepository for MemoryStore {
    fn get_card(&self, exercise_id: &str) -> Result<Option<ReviewCard>> {
        Ok(self.cards.get(exercise_id).cloned())
    }

    fn upsert_card(&mut self, card: &ReviewCard) -> Result<()> {
        self.check_writable(Table::ReviewCards)?;
        self.cards.insert(card.exercise_id.clone(), card.clone());
        Ok(())
    }

    fn cards_due_by(&self, now: DateTime<Utc>) -> Result<Vec<ReviewCard>> {
        let mut due: Vec<ReviewCard> = self
            .cards
            .values()
            .filter(|card| card.due <= now)
            .cloned()
            .collect();
        due.sort_by_key(|card| card.due);
        Ok(due)
    }

    fn list_cards(&self) -> Result<Vec<ReviewCard>> {
        Ok(self.cards.values().cloned().collect())
    }
}

impl LessonProgressRepository for MemoryStore {
    fn get_lesson_progress(&self, lesson_id: &str) -> Result<Option<LessonProgressRecord>> {
        Ok(self.lessons.get(lesson_id).cloned())
    }

    fn put_lesson_progress(&mut self, record: &LessonProgressRecord) -> Result<()> {
        self.check_writable(Table::LessonProgress)?;
        self.lessons.insert(record.lesson_id.clone(), record.clone());
        Ok(())
    }

    fn list_lesson_progress(&self) -> Result<Vec<LessonProgressRecord>> {
        Ok(self.lessons.values().cloned().collect())
    }
}

impl Transactional for MemoryStore {
    fn atomically<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        if self.depth > 0 {
            return f(self);
        }

        let checkpoint = self.clone();
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        if result.is_err() {
            *self = checkpoint;
        }
        result
    }
}
