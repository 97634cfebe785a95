use anyhow::{bail, Result};
use chrono::Utc;

use kata_lib::mastery::MasteryLevel;

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &mut App,
    concept: Option<&str>,
    level: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    match (concept, level) {
        (Some(concept), Some(level)) => {
            let level: MasteryLevel = level.parse()?;
            app.engine.set_mastery(concept, level, Utc::now())?;
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "concept": concept, "level": level });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Plain => println!("{} is now {}", concept, level),
            }
            Ok(())
        }
        (Some(_), None) => bail!("Missing level (not-started, learning, proficient or mastered)"),
        _ => list(app, format),
    }
}

fn list(app: &App, format: &OutputFormat) -> Result<()> {
    let levels = app.engine.concept_mastery()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&levels)?);
        }
        OutputFormat::Plain => {
            if levels.is_empty() {
                println!("No concepts tracked yet.");
                return Ok(());
            }

            let width = levels.keys().map(|c| c.len()).max().unwrap_or(7).max(7);
            println!("{:<width$} Level", "Concept", width = width);
            println!("{} {}", "\u{2500}".repeat(width), "\u{2500}".repeat(11));
            for (concept, level) in &levels {
                println!("{:<width$} {}", concept, level, width = width);
            }
        }
    }

    Ok(())
}
