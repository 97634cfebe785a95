use std::sync::Mutex;

pub mod attempts;
pub mod commands;
pub mod config;
pub mod content;
pub mod engine;
pub mod errors;
pub mod mastery;
pub mod progress;
pub mod review;
pub mod storage;

use content::StaticExerciseIndex;
use engine::PracticeEngine;
use storage::SqliteStore;

/// The engine as the app runs it: SQLite on disk and a static content index
pub type Engine = PracticeEngine<SqliteStore, StaticExerciseIndex>;

/// State shared by the UI commands. Calls are serialized by the mutex.
pub struct AppState {
    pub engine: Mutex<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }
}
