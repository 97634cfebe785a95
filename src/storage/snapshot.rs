//! Full-store snapshots for user-initiated backup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempts::Attempt;
use crate::mastery::ConceptMasteryRecord;
use crate::progress::LessonProgressRecord;
use crate::review::algorithm::validate_card;
use crate::review::ReviewCard;

use super::repository::{ProgressStore, Result, StorageError};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The contents of all four progress tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub attempts: Vec<Attempt>,
    pub concept_mastery: Vec<ConceptMasteryRecord>,
    pub review_cards: Vec<ReviewCard>,
    pub lesson_progress: Vec<LessonProgressRecord>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
            && self.concept_mastery.is_empty()
            && self.review_cards.is_empty()
            && self.lesson_progress.is_empty()
    }
}

pub fn export_snapshot<S: ProgressStore>(store: &S, now: DateTime<Utc>) -> Result<Snapshot> {
    Ok(Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        exported_at: now,
        attempts: store.list_attempts()?,
        concept_mastery: store.list_mastery()?,
        review_cards: store.list_cards()?,
        lesson_progress: store.list_lesson_progress()?,
    })
}

/// Restore a snapshot into an empty store, all or nothing
pub fn import_snapshot<S: ProgressStore>(store: &mut S, snapshot: &Snapshot) -> Result<()> {
    if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
        return Err(StorageError::InvalidBackup(format!(
            "unsupported snapshot format {}",
            snapshot.format_version
        )));
    }
    for card in &snapshot.review_cards {
        validate_card(card).map_err(|e| StorageError::InvalidBackup(e.to_string()))?;
    }
    if !export_snapshot(store, snapshot.exported_at)?.is_empty() {
        return Err(StorageError::NotEmpty);
    }

    store.atomically(|s| -> Result<()> {
        for attempt in &snapshot.attempts {
            s.append_attempt(attempt)?;
        }
        for record in &snapshot.concept_mastery {
            s.put_mastery(record)?;
        }
        for card in &snapshot.review_cards {
            s.upsert_card(card)?;
        }
        for record in &snapshot.lesson_progress {
            s.put_lesson_progress(record)?;
        }
        Ok(())
    })?;

    log::info!(
        "Imported snapshot from {}: {} attempts, {} cards",
        snapshot.exported_at,
        snapshot.attempts.len(),
        snapshot.review_cards.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempts::{AttemptLedger, ExerciseType};
    use crate::mastery::{MasteryLevel, MasteryTracker};
    use crate::storage::{
        AttemptRepository, LessonProgressRepository, MemoryStore, ReviewCardRepository,
        SqliteStore,
    };
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
    }

    fn populated() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .record(&Attempt::new("e1", "l1", "m1", ExerciseType::Trace, true, t0()))
            .unwrap();
        store.set_level("loops", MasteryLevel::Learning, t0()).unwrap();
        store.upsert_card(&ReviewCard::new("e1", t0())).unwrap();
        store
            .put_lesson_progress(&LessonProgressRecord::started("l1", "m1", t0()))
            .unwrap();
        store
    }

    #[test]
    fn test_export_contains_every_table() {
        let snapshot = export_snapshot(&populated(), t0()).unwrap();
        assert_eq!(snapshot.format_version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(snapshot.attempts.len(), 1);
        assert_eq!(snapshot.concept_mastery.len(), 1);
        assert_eq!(snapshot.review_cards.len(), 1);
        assert_eq!(snapshot.lesson_progress.len(), 1);
    }

    #[test]
    fn test_import_into_empty_sqlite_store() {
        let snapshot = export_snapshot(&populated(), t0()).unwrap();
        let mut target = SqliteStore::open_in_memory().unwrap();
        import_snapshot(&mut target, &snapshot).unwrap();

        let restored = export_snapshot(&target, t0()).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_import_rejects_invalid_card() {
        let mut snapshot = export_snapshot(&populated(), t0()).unwrap();
        snapshot.review_cards[0].difficulty = f64::NAN;

        let mut target = MemoryStore::new();
        assert!(matches!(
            import_snapshot(&mut target, &snapshot),
            Err(StorageError::InvalidBackup(_))
        ));
        assert!(target.list_attempts().unwrap().is_empty());
    }

    #[test]
    fn test_import_refuses_non_empty_store() {
        let snapshot = export_snapshot(&populated(), t0()).unwrap();
        let mut target = populated();
        assert!(matches!(
            import_snapshot(&mut target, &snapshot),
            Err(StorageError::NotEmpty)
        ));
        assert_eq!(target.list_attempts().unwrap().len(), 1);
    }
}
