mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kata-cli", about = "Practice progress, reviews and mastery", version)]
struct Cli {
    /// Data directory (default: platform local data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Content index JSON manifest (overrides config.toml)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Record an exercise attempt
    Record {
        /// Exercise ID
        exercise: String,
        /// Exercise type: trace, parsons, fill-in or write
        #[arg(long = "type", default_value = "write")]
        exercise_type: String,
        /// The attempt failed
        #[arg(long)]
        fail: bool,
        /// Lesson ID (default: from the content index)
        #[arg(long)]
        lesson: Option<String>,
        /// Module ID (default: from the content index)
        #[arg(long)]
        module: Option<String>,
        /// Time spent in milliseconds
        #[arg(long)]
        time_ms: Option<u64>,
        /// File containing the submitted code
        #[arg(long)]
        code_file: Option<PathBuf>,
    },

    /// Grade a review: again, hard, good, easy or 1-4
    Review {
        /// Exercise ID
        exercise: String,
        /// Rating
        rating: String,
    },

    /// List exercises due for review
    Due {
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show lesson progress, or one module's summary
    Progress {
        /// Summarize a single module
        #[arg(long)]
        module: Option<String>,
    },

    /// List concept mastery, or set a concept's level
    Mastery {
        /// Concept to set
        concept: Option<String>,
        /// New level: not-started, learning, proficient or mastered
        level: Option<String>,
    },

    /// Review card statistics
    Stats,

    /// Print a JSON snapshot of all progress
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create a ZIP backup in the data directory
    Backup {
        /// List existing backups instead
        #[arg(long)]
        list: bool,
    },

    /// Restore a backup or snapshot into an empty database
    Restore {
        /// Backup ZIP or exported snapshot JSON
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut app = app::App::new(cli.data_dir.as_deref(), cli.index.as_deref())?;

    match cli.command {
        Command::Record {
            exercise,
            exercise_type,
            fail,
            lesson,
            module,
            time_ms,
            code_file,
        } => {
            let request = commands::record::RecordRequest {
                exercise_id: exercise,
                exercise_type,
                success: !fail,
                lesson_id: lesson,
                module_id: module,
                time_spent_ms: time_ms,
                code_file,
            };
            commands::record::run(&mut app, request, &cli.format)?;
        }
        Command::Review { exercise, rating } => {
            commands::review::run(&mut app, &exercise, &rating, &cli.format)?;
        }
        Command::Due { limit } => {
            commands::due::run(&app, limit, &cli.format)?;
        }
        Command::Progress { module } => {
            commands::progress::run(&app, module.as_deref(), &cli.format)?;
        }
        Command::Mastery { concept, level } => {
            commands::mastery::run(&mut app, concept.as_deref(), level.as_deref(), &cli.format)?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format)?;
        }
        Command::Export { output } => {
            commands::backup::run_export(&app, output.as_deref())?;
        }
        Command::Backup { list } => {
            if list {
                commands::backup::run_list(&app, &cli.format)?;
            } else {
                commands::backup::run_create(&app, &cli.format)?;
            }
        }
        Command::Restore { path } => {
            commands::backup::run_restore(&mut app, &path, &cli.format)?;
        }
    }

    Ok(())
}
