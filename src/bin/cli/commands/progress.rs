use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, module_id: Option<&str>, format: &OutputFormat) -> Result<()> {
    if let Some(module_id) = module_id {
        return run_module(app, module_id, format);
    }

    let lessons = app.engine.all_lesson_progress()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&lessons)?);
        }
        OutputFormat::Plain => {
            if lessons.is_empty() {
                println!("No lessons started yet.");
                return Ok(());
            }

            let width = lessons
                .iter()
                .map(|l| l.lesson_id.len())
                .max()
                .unwrap_or(6)
                .max(6);
            println!("{:<width$} {:<12} Status", "Lesson", "Module", width = width);
            println!("{} {} {}", "\u{2500}".repeat(width), "\u{2500}".repeat(12), "\u{2500}".repeat(11));

            for lesson in &lessons {
                let status = if lesson.completed { "complete" } else { "in progress" };
                println!(
                    "{:<width$} {:<12} {}",
                    lesson.lesson_id,
                    lesson.module_id,
                    status,
                    width = width
                );
            }

            let completed = lessons.iter().filter(|l| l.completed).count();
            println!("\n{} of {} lessons complete", completed, lessons.len());
        }
    }

    Ok(())
}

fn run_module(app: &App, module_id: &str, format: &OutputFormat) -> Result<()> {
    let progress = app.engine.module_progress(module_id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        OutputFormat::Plain => {
            if progress.lessons_total == 0 {
                println!("Module {} has no lessons in the content index.", module_id);
                return Ok(());
            }
            println!(
                "Module {}: {}/{} lessons complete{}",
                progress.module_id,
                progress.lessons_completed,
                progress.lessons_total,
                if progress.completed { " \u{2713}" } else { "" }
            );
        }
    }

    Ok(())
}
