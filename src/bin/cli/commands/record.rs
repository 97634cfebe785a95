use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use kata_lib::attempts::{Attempt, ExerciseType};
use kata_lib::content::ExerciseIndex;
use kata_lib::review::format_interval;

use crate::app::App;
use crate::OutputFormat;

pub struct RecordRequest {
    pub exercise_id: String,
    pub exercise_type: String,
    pub success: bool,
    pub lesson_id: Option<String>,
    pub module_id: Option<String>,
    pub time_spent_ms: Option<u64>,
    pub code_file: Option<PathBuf>,
}

pub fn run(app: &mut App, request: RecordRequest, format: &OutputFormat) -> Result<()> {
    let exercise_type: ExerciseType = request.exercise_type.parse()?;

    let entry = app.engine.index().lookup(&request.exercise_id);
    let lesson_id = match request.lesson_id.or_else(|| entry.map(|e| e.lesson_id.clone())) {
        Some(id) => id,
        None => bail!(
            "Exercise '{}' is not in the content index; pass --lesson and --module",
            request.exercise_id
        ),
    };
    let module_id = request
        .module_id
        .or_else(|| entry.map(|e| e.module_id.clone()))
        .context("Missing --module for an exercise outside the content index")?;

    let mut attempt = Attempt::new(
        request.exercise_id,
        lesson_id,
        module_id,
        exercise_type,
        request.success,
        Utc::now(),
    )
    .with_time_spent(request.time_spent_ms.unwrap_or(0));
    if let Some(path) = &request.code_file {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        attempt = attempt.with_code(code);
    }

    let outcome = app
        .engine
        .submit(attempt.clone())
        .context("Failed to record attempt")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => {
            let verdict = if attempt.success { "passed" } else { "failed" };
            println!("Recorded {} attempt on {}", verdict, attempt.exercise_id);
            if let Some(card) = &outcome.card {
                println!(
                    "  Next review in {} ({})",
                    format_interval(card.scheduled_days),
                    card.state
                );
            }
            for concept in &outcome.concepts_advanced {
                println!("  Concept advanced: {}", concept);
            }
            if outcome.completion.is_some_and(|c| c.newly_completed) {
                println!("  Lesson {} complete!", attempt.lesson_id);
            }
        }
    }

    Ok(())
}
