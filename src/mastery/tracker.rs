//! Keyed mastery store operations
//!
//! The tracker does not decide when a concept advances. That policy lives in
//! the engine: passing an exercise raises its concepts to `learning`, and
//! completing a lesson raises them to `proficient`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::storage::{MasteryRepository, Result};

use super::models::{ConceptMasteryRecord, MasteryLevel};

pub trait MasteryTracker: MasteryRepository {
    /// Set a concept's level unconditionally
    fn set_level(&mut self, concept: &str, level: MasteryLevel, now: DateTime<Utc>) -> Result<()> {
        self.put_mastery(&ConceptMasteryRecord::new(concept, level, now))
    }

    /// Current level, `not-started` for concepts never seen
    fn level(&self, concept: &str) -> Result<MasteryLevel> {
        Ok(self
            .get_mastery(concept)?
            .map(|record| record.level)
            .unwrap_or_default())
    }

    fn all_levels(&self) -> Result<BTreeMap<String, MasteryLevel>> {
        Ok(self
            .list_mastery()?
            .into_iter()
            .map(|record| (record.concept, record.level))
            .collect())
    }

    /// Raise a concept to at least `level`. Returns true if the level changed.
    fn raise_to(&mut self, concept: &str, level: MasteryLevel, now: DateTime<Utc>) -> Result<bool> {
        let current = self.level(concept)?;
        if current >= level {
            return Ok(false);
        }
        log::info!("Concept '{}' advanced from {} to {}", concept, current, level);
        self.set_level(concept, level, now)?;
        Ok(true)
    }
}

impl<T: MasteryRepository + ?Sized> MasteryTracker for T {}
