use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use kata_lib::storage::backup::{create_backup, get_backup_info, list_backups, read_backup};
use kata_lib::storage::Snapshot;

use crate::app::App;
use crate::OutputFormat;

pub fn run_export(app: &App, output: Option<&Path>) -> Result<()> {
    let snapshot = app.engine.export_snapshot(Utc::now())?;
    let json = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} attempts to {}", snapshot.attempts.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

pub fn run_create(app: &App, format: &OutputFormat) -> Result<()> {
    let snapshot = app.engine.export_snapshot(Utc::now())?;
    let path = create_backup(&snapshot, &app.data_dir).context("Failed to create backup")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path.display().to_string(),
                "attempts": snapshot.attempts.len(),
                "reviewCards": snapshot.review_cards.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Backup written to {}", path.display());
            println!(
                "  {} attempts, {} review cards",
                snapshot.attempts.len(),
                snapshot.review_cards.len()
            );
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat) -> Result<()> {
    let backups = list_backups(&app.data_dir)?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = backups
                .iter()
                .map(|path| {
                    let info = get_backup_info(path).ok();
                    serde_json::json!({
                        "path": path.display().to_string(),
                        "metadata": info,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if backups.is_empty() {
                println!("No backups found.");
                return Ok(());
            }
            for path in &backups {
                match get_backup_info(path) {
                    Ok(info) => println!(
                        "{}  {} attempts, {} cards",
                        path.display(),
                        info.attempt_count,
                        info.card_count
                    ),
                    Err(e) => println!("{}  (unreadable: {})", path.display(), e),
                }
            }
        }
    }

    Ok(())
}

pub fn run_restore(app: &mut App, path: &Path, format: &OutputFormat) -> Result<()> {
    let snapshot: Snapshot = if path.extension().is_some_and(|ext| ext == "zip") {
        read_backup(path).with_context(|| format!("Failed to read backup {}", path.display()))?
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).context("Invalid snapshot JSON")?
    };

    app.engine
        .import_snapshot(&snapshot)
        .context("Restore needs an empty progress database")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "restored": true,
                "exportedAt": snapshot.exported_at.to_rfc3339(),
                "attempts": snapshot.attempts.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Restored {} attempts from snapshot taken {}",
                snapshot.attempts.len(),
                snapshot.exported_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    Ok(())
}
