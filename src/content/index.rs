use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Exercise listed twice: {0}")]
    DuplicateExercise(String),
}

pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseIndexEntry {
    pub exercise_id: String,
    pub module_id: String,
    pub lesson_id: String,
    #[serde(default)]
    pub concept_tags: Vec<String>,
}

impl ExerciseIndexEntry {
    pub fn new(
        exercise_id: impl Into<String>,
        module_id: impl Into<String>,
        lesson_id: impl Into<String>,
        concept_tags: &[&str],
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            module_id: module_id.into(),
            lesson_id: lesson_id.into(),
            concept_tags: concept_tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Read-only view of course content supplied by the content loader
pub trait ExerciseIndex {
    fn lookup(&self, exercise_id: &str) -> Option<&ExerciseIndexEntry>;

    /// Every exercise belonging to a lesson
    fn exercises_of(&self, lesson_id: &str) -> BTreeSet<String>;

    /// Every lesson belonging to a module
    fn lessons_of(&self, module_id: &str) -> BTreeSet<String>;
}

/// In-memory index built once per session
#[derive(Debug, Clone, Default)]
pub struct StaticExerciseIndex {
    entries: HashMap<String, ExerciseIndexEntry>,
    by_lesson: HashMap<String, BTreeSet<String>>,
    by_module: HashMap<String, BTreeSet<String>>,
}

impl StaticExerciseIndex {
    pub fn from_entries(entries: impl IntoIterator<Item = ExerciseIndexEntry>) -> Result<Self> {
        let mut index = Self::default();
        for entry in entries {
            if index.entries.contains_key(&entry.exercise_id) {
                return Err(ContentError::DuplicateExercise(entry.exercise_id));
            }
            index
                .by_lesson
                .entry(entry.lesson_id.clone())
                .or_default()
                .insert(entry.exercise_id.clone());
            index
                .by_module
                .entry(entry.module_id.clone())
                .or_default()
                .insert(entry.lesson_id.clone());
            index.entries.insert(entry.exercise_id.clone(), entry);
        }
        Ok(index)
    }

    /// Load a JSON manifest: an array of index entries
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let entries: Vec<ExerciseIndexEntry> = serde_json::from_str(&content)?;
        let index = Self::from_entries(entries)?;
        log::info!(
            "Loaded {} exercises in {} lessons from {:?}",
            index.len(),
            index.by_lesson.len(),
            path
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExerciseIndex for StaticExerciseIndex {
    fn lookup(&self, exercise_id: &str) -> Option<&ExerciseIndexEntry> {
        self.entries.get(exercise_id)
    }

    fn exercises_of(&self, lesson_id: &str) -> BTreeSet<String> {
        self.by_lesson.get(lesson_id).cloned().unwrap_or_default()
    }

    fn lessons_of(&self, module_id: &str) -> BTreeSet<String> {
        self.by_module.get(module_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<ExerciseIndexEntry> {
        vec![
            ExerciseIndexEntry::new("e1", "m1", "l1", &["loops"]),
            ExerciseIndexEntry::new("e2", "m1", "l1", &["loops", "lists"]),
            ExerciseIndexEntry::new("e3", "m1", "l2", &[]),
        ]
    }

    #[test]
    fn test_groups_by_lesson_and_module() {
        let index = StaticExerciseIndex::from_entries(sample()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.exercises_of("l1").into_iter().collect::<Vec<_>>(),
            vec!["e1", "e2"]
        );
        assert_eq!(index.lessons_of("m1").len(), 2);
        assert!(index.exercises_of("nope").is_empty());
        assert_eq!(index.lookup("e2").unwrap().concept_tags, vec!["loops", "lists"]);
        assert!(index.lookup("e9").is_none());
    }

    #[test]
    fn test_duplicate_exercise_rejected() {
        let mut entries = sample();
        entries.push(ExerciseIndexEntry::new("e1", "m2", "l3", &[]));
        assert!(matches!(
            StaticExerciseIndex::from_entries(entries),
            Err(ContentError::DuplicateExercise(id)) if id == "e1"
        ));
    }

    #[test]
    fn test_load_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("course.json");
        fs::write(
            &path,
            r#"[
                {"exerciseId": "e1", "moduleId": "m1", "lessonId": "l1", "conceptTags": ["variables"]},
                {"exerciseId": "e2", "moduleId": "m1", "lessonId": "l1"}
            ]"#,
        )
        .unwrap();

        let index = StaticExerciseIndex::load(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.lookup("e2").unwrap().concept_tags.is_empty());
    }
}
