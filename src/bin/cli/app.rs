use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use kata_lib::config::{self, KataConfig};
use kata_lib::content::StaticExerciseIndex;
use kata_lib::engine::PracticeEngine;
use kata_lib::review::Scheduler;
use kata_lib::storage::SqliteStore;
use kata_lib::Engine;

const DATABASE_FILE: &str = "progress.db";

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub config: KataConfig,
    pub engine: Engine,
}

impl App {
    /// Open the progress database, creating it on first use
    pub fn new(data_dir: Option<&Path>, index_path: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => config::default_data_dir().context("Failed to get data directory")?,
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = config::load_config(&data_dir).context("Failed to load config.toml")?;
        let scheduler =
            Scheduler::new(config.scheduler.clone()).context("Invalid scheduler settings")?;

        let index = match index_path.or(config.content_index.as_deref()) {
            Some(path) => StaticExerciseIndex::load(path)
                .with_context(|| format!("Failed to load content index {}", path.display()))?,
            None => {
                log::warn!("No content index configured; mastery and lesson progress are skipped");
                StaticExerciseIndex::default()
            }
        };

        let store = SqliteStore::open(&data_dir.join(DATABASE_FILE))
            .context("Failed to open progress database")?;

        Ok(Self {
            data_dir,
            config,
            engine: PracticeEngine::new(store, index, scheduler),
        })
    }
}
