use anyhow::{Context, Result};
use chrono::Utc;

use kata_lib::review::{format_interval, Rating};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &mut App, exercise_id: &str, rating: &str, format: &OutputFormat) -> Result<()> {
    let rating: Rating = rating.parse()?;
    let card = app
        .engine
        .review_exercise(exercise_id, rating, Utc::now())
        .with_context(|| format!("Failed to review {}", exercise_id))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        OutputFormat::Plain => {
            println!("Reviewed {} as {}", card.exercise_id, rating);
            println!("  State: {}", card.state);
            println!(
                "  Next review in {} ({})",
                format_interval(card.scheduled_days),
                card.due.format("%Y-%m-%d %H:%M")
            );
            if card.lapses > 0 {
                println!("  Lapses: {}", card.lapses);
            }
        }
    }

    Ok(())
}
