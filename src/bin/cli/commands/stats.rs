use anyhow::Result;
use chrono::Utc;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let stats = app.engine.review_stats(Utc::now())?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Plain => {
            println!("Review cards: {}", stats.total_cards);
            println!("  New:        {}", stats.new_cards);
            println!("  Learning:   {}", stats.learning_cards);
            println!("  Review:     {}", stats.review_cards);
            println!("  Relearning: {}", stats.relearning_cards);
            println!("Due now:      {}", stats.due_cards);
            println!("Lapses:       {}", stats.total_lapses);
        }
    }

    Ok(())
}
