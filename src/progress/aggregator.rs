//! Lesson completion aggregation
//!
//! A lesson is complete once every exercise the content index lists for it
//! has at least one passing attempt. The transition to complete happens once;
//! on that transition every concept tagged in the lesson is raised to at
//! least `proficient`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::attempts::AttemptLedger;
use crate::content::ExerciseIndex;
use crate::mastery::{MasteryLevel, MasteryTracker};
use crate::storage::{
    AttemptRepository, LessonProgressRepository, MasteryRepository, Result, Transactional,
};

use super::models::{CompletionStatus, LessonProgressRecord, ModuleProgress};

pub struct LessonAggregator<'a, S, I: ?Sized> {
    store: &'a mut S,
    index: &'a I,
}

impl<'a, S, I> LessonAggregator<'a, S, I>
where
    S: AttemptRepository + LessonProgressRepository + MasteryRepository + Transactional,
    I: ExerciseIndex + ?Sized,
{
    pub fn new(store: &'a mut S, index: &'a I) -> Self {
        Self { store, index }
    }

    /// Create the lesson's progress record on first contact
    pub fn touch(
        &mut self,
        lesson_id: &str,
        module_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LessonProgressRecord> {
        if let Some(existing) = self.store.get_lesson_progress(lesson_id)? {
            return Ok(existing);
        }
        let record = LessonProgressRecord::started(lesson_id, module_id, now);
        self.store.put_lesson_progress(&record)?;
        Ok(record)
    }

    /// Re-evaluate a lesson, promoting its concepts on the first completion
    pub fn check_completion(&mut self, lesson_id: &str, now: DateTime<Utc>) -> Result<CompletionStatus> {
        let exercises = self.index.exercises_of(lesson_id);
        if exercises.is_empty() {
            log::warn!(
                "Lesson {} has no exercises in the content index; it cannot be completed",
                lesson_id
            );
            return Ok(CompletionStatus::default());
        }

        // Passes count by exercise id, whatever lesson the attempt was filed under
        let mut completed = true;
        for exercise_id in &exercises {
            if self.store.pass_count(exercise_id)? == 0 {
                completed = false;
                break;
            }
        }

        let existing = self.store.get_lesson_progress(lesson_id)?;
        let already_completed = existing.as_ref().is_some_and(|r| r.completed);
        if !completed || already_completed {
            return Ok(CompletionStatus {
                completed,
                newly_completed: false,
            });
        }

        let module_id = match existing {
            Some(record) => record.module_id,
            None => exercises
                .iter()
                .find_map(|id| self.index.lookup(id))
                .map(|entry| entry.module_id.clone())
                .unwrap_or_default(),
        };
        let concepts: BTreeSet<String> = exercises
            .iter()
            .filter_map(|id| self.index.lookup(id))
            .flat_map(|entry| entry.concept_tags.iter().cloned())
            .collect();

        let record = LessonProgressRecord {
            lesson_id: lesson_id.to_string(),
            module_id,
            completed: true,
            updated_at: now,
        };
        self.store.atomically(|store| -> Result<()> {
            store.put_lesson_progress(&record)?;
            for concept in &concepts {
                store.raise_to(concept, MasteryLevel::Proficient, now)?;
            }
            Ok(())
        })?;

        log::info!(
            "Lesson {} completed; {} concept(s) now at least proficient",
            lesson_id,
            concepts.len()
        );

        Ok(CompletionStatus {
            completed: true,
            newly_completed: true,
        })
    }

    pub fn module_progress(&self, module_id: &str) -> Result<ModuleProgress> {
        module_progress(&*self.store, self.index, module_id)
    }
}

/// Completion summary over every lesson the index lists for a module
pub fn module_progress<S, I>(store: &S, index: &I, module_id: &str) -> Result<ModuleProgress>
where
    S: LessonProgressRepository + ?Sized,
    I: ExerciseIndex + ?Sized,
{
    let lessons = index.lessons_of(module_id);
    let mut lessons_completed = 0;
    for lesson_id in &lessons {
        if store
            .get_lesson_progress(lesson_id)?
            .is_some_and(|record| record.completed)
        {
            lessons_completed += 1;
        }
    }

    Ok(ModuleProgress {
        module_id: module_id.to_string(),
        lessons_total: lessons.len(),
        lessons_completed,
        completed: !lessons.is_empty() && lessons_completed == lessons.len(),
    })
}
