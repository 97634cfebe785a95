use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::repository::{Result, StorageError};
use super::snapshot::Snapshot;

const METADATA_FILE: &str = "_backup_metadata.json";
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Backup metadata stored in the ZIP file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub attempt_count: usize,
    pub card_count: usize,
    pub concept_count: usize,
    pub lesson_count: usize,
}

impl BackupMetadata {
    fn describe(snapshot: &Snapshot) -> Self {
        Self {
            version: snapshot.format_version.to_string(),
            created_at: snapshot.exported_at,
            attempt_count: snapshot.attempts.len(),
            card_count: snapshot.review_cards.len(),
            concept_count: snapshot.concept_mastery.len(),
            lesson_count: snapshot.lesson_progress.len(),
        }
    }
}

/// Get the backup directory
pub fn get_backup_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("backups")
}

/// Write a snapshot to a ZIP file
pub fn write_backup(snapshot: &Snapshot, output_path: &Path) -> Result<BackupMetadata> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(SNAPSHOT_FILE, options)?;
    zip.write_all(serde_json::to_string_pretty(snapshot)?.as_bytes())?;

    let metadata = BackupMetadata::describe(snapshot);
    zip.start_file(METADATA_FILE, options)?;
    zip.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

    zip.finish()?;
    log::info!("Wrote backup to {:?}", output_path);

    Ok(metadata)
}

/// Write a timestamped backup into the data directory's backup folder
pub fn create_backup(snapshot: &Snapshot, data_dir: &Path) -> Result<PathBuf> {
    let name = format!(
        "kata-backup-{}.zip",
        snapshot.exported_at.format("%Y%m%d-%H%M%S")
    );
    let path = get_backup_dir(data_dir).join(name);
    write_backup(snapshot, &path)?;
    Ok(path)
}

/// List backups, newest first
pub fn list_backups(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = get_backup_dir(data_dir);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "zip") {
            backups.push(path);
        }
    }
    // Names embed the timestamp, so name order is time order
    backups.sort();
    backups.reverse();
    Ok(backups)
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<String> {
    let index = archive
        .index_for_name(name)
        .ok_or_else(|| StorageError::InvalidBackup(format!("{} not found", name)))?;
    let mut entry = archive.by_index(index)?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Read the snapshot stored in a backup
pub fn read_backup(zip_path: &Path) -> Result<Snapshot> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let contents = read_entry(&mut archive, SNAPSHOT_FILE)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Get backup metadata from a ZIP file without reading the snapshot
pub fn get_backup_info(zip_path: &Path) -> Result<BackupMetadata> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let contents = read_entry(&mut archive, METADATA_FILE)?;
    Ok(serde_json::from_str(&contents)?)
}
