use anyhow::Result;
use chrono::Utc;

use kata_lib::review::format_interval;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, limit: usize, format: &OutputFormat) -> Result<()> {
    let now = Utc::now();
    let cards = app.engine.due_cards(now)?;
    let total = cards.len();
    let shown: Vec<_> = cards.into_iter().take(limit).collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = shown
                .iter()
                .map(|card| {
                    serde_json::json!({
                        "exerciseId": card.exercise_id,
                        "due": card.due.to_rfc3339(),
                        "state": card.state.as_str(),
                        "reps": card.reps,
                        "lapses": card.lapses,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if shown.is_empty() {
                println!("Nothing due for review.");
                return Ok(());
            }

            let width = shown
                .iter()
                .map(|c| c.exercise_id.len())
                .max()
                .unwrap_or(8)
                .max(8);
            println!("{:<width$} {:<11} Overdue", "Exercise", "State", width = width);
            println!("{} {} {}", "\u{2500}".repeat(width), "\u{2500}".repeat(11), "\u{2500}".repeat(8));

            for card in &shown {
                let overdue = (now - card.due).num_seconds() as f64 / 86_400.0;
                println!(
                    "{:<width$} {:<11} {}",
                    card.exercise_id,
                    card.state.as_str(),
                    format_interval(overdue),
                    width = width
                );
            }

            println!("\n{} due", total);
        }
    }

    Ok(())
}
