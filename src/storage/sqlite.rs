//! SQLite-backed progress store
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL matches chronological order.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::attempts::Attempt;
use crate::mastery::ConceptMasteryRecord;
use crate::progress::LessonProgressRecord;
use crate::review::ReviewCard;

use super::repository::*;

const SCHEMA_VERSION: i32 = 1;

const ATTEMPT_COLUMNS: &str =
    "id, exercise_id, lesson_id, module_id, type, success, code, time_spent_ms, attempted_at";

const CARD_COLUMNS: &str = "exercise_id, due, stability, difficulty, elapsed_days, scheduled_days, \
     reps, lapses, state, last_review, created_at";

pub struct SqliteStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id TEXT PRIMARY KEY,
                exercise_id TEXT NOT NULL,
                lesson_id TEXT NOT NULL,
                module_id TEXT NOT NULL,
                type TEXT NOT NULL,
                success INTEGER NOT NULL,
                code TEXT,
                time_spent_ms INTEGER NOT NULL DEFAULT 0,
                attempted_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS concept_mastery (
                concept TEXT PRIMARY KEY,
                level TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS review_cards (
                exercise_id TEXT PRIMARY KEY,
                due TEXT NOT NULL,
                stability REAL NOT NULL,
                difficulty REAL NOT NULL,
                elapsed_days REAL NOT NULL,
                scheduled_days REAL NOT NULL,
                reps INTEGER NOT NULL,
                lapses INTEGER NOT NULL,
                state TEXT NOT NULL,
                last_review TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lesson_progress (
                lesson_id TEXT PRIMARY KEY,
                module_id TEXT NOT NULL,
                completed INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_exercise_id ON attempts(exercise_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_lesson_id ON attempts(lesson_id);
            CREATE INDEX IF NOT EXISTS idx_review_cards_due ON review_cards(due);
            "#,
        )?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn query_attempts(&self, filter: &str, value: Option<&str>) -> Result<Vec<Attempt>> {
        // rowid breaks ties between attempts recorded at the same instant
        let sql = format!(
            "SELECT {} FROM attempts {} ORDER BY attempted_at ASC, rowid ASC",
            ATTEMPT_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match value {
            Some(v) => stmt
                .query_map(params![v], attempt_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], attempt_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_optional_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => get_timestamp(row, idx).map(Some),
        None => Ok(None),
    }
}

fn get_parsed<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn attempt_from_row(row: &Row) -> rusqlite::Result<Attempt> {
    let id: String = row.get(0)?;
    Ok(Attempt {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        exercise_id: row.get(1)?,
        lesson_id: row.get(2)?,
        module_id: row.get(3)?,
        exercise_type: get_parsed(row, 4)?,
        success: row.get(5)?,
        submitted_code: row.get(6)?,
        time_spent_ms: u64::try_from(row.get::<_, i64>(7)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Integer, Box::new(e)))?,
        attempted_at: get_timestamp(row, 8)?,
    })
}

fn mastery_from_row(row: &Row) -> rusqlite::Result<ConceptMasteryRecord> {
    Ok(ConceptMasteryRecord {
        concept: row.get(0)?,
        level: get_parsed(row, 1)?,
        updated_at: get_timestamp(row, 2)?,
    })
}

fn card_from_row(row: &Row) -> rusqlite::Result<ReviewCard> {
    Ok(ReviewCard {
        exercise_id: row.get(0)?,
        due: get_timestamp(row, 1)?,
        stability: row.get(2)?,
        difficulty: row.get(3)?,
        elapsed_days: row.get(4)?,
        scheduled_days: row.get(5)?,
        reps: row.get(6)?,
        lapses: row.get(7)?,
        state: get_parsed(row, 8)?,
        last_review: get_optional_timestamp(row, 9)?,
        created_at: get_timestamp(row, 10)?,
    })
}

fn lesson_from_row(row: &Row) -> rusqlite::Result<LessonProgressRecord> {
    Ok(LessonProgressRecord {
        lesson_id: row.get(0)?,
        module_id: row.get(1)?,
        completed: row.get(2)?,
        updated_at: get_timestamp(row, 3)?,
    })
}

impl AttemptRepository for SqliteStore {
    fn append_attempt(&mut self, attempt: &Attempt) -> Result<()> {
        let time_spent_ms = i64::try_from(attempt.time_spent_ms).map_err(|_| {
            StorageError::InvalidValue(format!(
                "time spent {}ms on {} is too large to store",
                attempt.time_spent_ms, attempt.exercise_id
            ))
        })?;
        self.conn.execute(
            &format!(
                "INSERT INTO attempts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                ATTEMPT_COLUMNS
            ),
            params![
                attempt.id.to_string(),
                attempt.exercise_id,
                attempt.lesson_id,
                attempt.module_id,
                attempt.exercise_type.as_str(),
                attempt.success,
                attempt.submitted_code,
                time_spent_ms,
                timestamp(&attempt.attempted_at),
            ],
        )?;
        Ok(())
    }

    fn attempts_for_exercise(&self, exercise_id: &str) -> Result<Vec<Attempt>> {
        self.query_attempts("WHERE exercise_id = ?1", Some(exercise_id))
    }

    fn attempts_for_lesson(&self, lesson_id: &str) -> Result<Vec<Attempt>> {
        self.query_attempts("WHERE lesson_id = ?1", Some(lesson_id))
    }

    fn list_attempts(&self) -> Result<Vec<Attempt>> {
        self.query_attempts("", None)
    }
}

impl MasteryRepository for SqliteStore {
    fn get_mastery(&self, concept: &str) -> Result<Option<ConceptMasteryRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT concept, level, updated_at FROM concept_mastery WHERE concept = ?1",
                params![concept],
                mastery_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn put_mastery(&mut self, record: &ConceptMasteryRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO concept_mastery (concept, level, updated_at) VALUES (?1, ?2, ?3)",
            params![record.concept, record.level.as_str(), timestamp(&record.updated_at)],
        )?;
        Ok(())
    }

    fn list_mastery(&self) -> Result<Vec<ConceptMasteryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT concept, level, updated_at FROM concept_mastery ORDER BY concept")?;
        let records = stmt
            .query_map([], mastery_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl ReviewCardRepository for SqliteStore {
    fn get_card(&self, exercise_id: &str) -> Result<Option<ReviewCard>> {
        let card = self
            .conn
            .query_row(
                &format!("SELECT {} FROM review_cards WHERE exercise_id = ?1", CARD_COLUMNS),
                params![exercise_id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    fn upsert_card(&mut self, card: &ReviewCard) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO review_cards ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                CARD_COLUMNS
            ),
            params![
                card.exercise_id,
                timestamp(&card.due),
                card.stability,
                card.difficulty,
                card.elapsed_days,
                card.scheduled_days,
                card.reps,
                card.lapses,
                card.state.as_str(),
                card.last_review.as_ref().map(timestamp),
                timestamp(&card.created_at),
            ],
        )?;
        Ok(())
    }

    fn cards_due_by(&self, now: DateTime<Utc>) -> Result<Vec<ReviewCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM review_cards WHERE due <= ?1 ORDER BY due ASC, exercise_id ASC",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map(params![timestamp(&now)], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn list_cards(&self) -> Result<Vec<ReviewCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM review_cards ORDER BY exercise_id",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }
}

impl LessonProgressRepository for SqliteStore {
    fn get_lesson_progress(&self, lesson_id: &str) -> Result<Option<LessonProgressRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT lesson_id, module_id, completed, updated_at FROM lesson_progress WHERE lesson_id = ?1",
                params![lesson_id],
                lesson_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn put_lesson_progress(&mut self, record: &LessonProgressRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO lesson_progress (lesson_id, module_id, completed, updated_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.lesson_id,
                record.module_id,
                record.completed,
                timestamp(&record.updated_at),
            ],
        )?;
        Ok(())
    }

    fn list_lesson_progress(&self) -> Result<Vec<LessonProgressRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT lesson_id, module_id, completed, updated_at FROM lesson_progress ORDER BY lesson_id",
        )?;
        let records = stmt
            .query_map([], lesson_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl Transactional for SqliteStore {
    fn atomically<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(StorageError::from(e)))?;

        match f(self) {
            Ok(value) => {
                if let Err(err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(E::from(StorageError::from(err)));
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempts::{AttemptLedger, ExerciseType};
    use crate::mastery::{MasteryLevel, MasteryTracker};
    use crate::review::{CardStatus, DueReviewQuery};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 7, 15, 30).unwrap() + Duration::nanoseconds(123_456_789)
    }

    fn card(exercise_id: &str, due: DateTime<Utc>) -> ReviewCard {
        let mut card = ReviewCard::new(exercise_id, t0());
        card.state = CardStatus::Review;
        card.stability = 12.5;
        card.difficulty = 4.25;
        card.elapsed_days = 3.0;
        card.scheduled_days = 11.8;
        card.reps = 4;
        card.lapses = 1;
        card.last_review = Some(t0());
        card.due = due;
        card
    }

    #[test]
    fn test_rows_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("progress.db");

        let attempt = Attempt::new("e1", "l1", "m1", ExerciseType::FillIn, true, t0())
            .with_time_spent(4200)
            .with_code("print(1)");
        let stored_card = card("e1", t0() + Duration::days(11));
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.record(&attempt).unwrap();
            store.upsert_card(&stored_card).unwrap();
            store.set_level("loops", MasteryLevel::Learning, t0()).unwrap();
            store
                .put_lesson_progress(&LessonProgressRecord::started("l1", "m1", t0()))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.history("e1").unwrap(), vec![attempt]);
        assert_eq!(store.get_card("e1").unwrap(), Some(stored_card));
        assert_eq!(store.level("loops").unwrap(), MasteryLevel::Learning);
        assert!(!store.get_lesson_progress("l1").unwrap().unwrap().completed);
        assert_eq!(store.db_path(), Some(path.as_path()));
    }

    #[test]
    fn test_history_orders_by_time_then_insertion() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let later = Attempt::new("e1", "l1", "m1", ExerciseType::Write, true, t0() + Duration::minutes(5));
        let first = Attempt::new("e1", "l1", "m1", ExerciseType::Write, false, t0());
        let tie = Attempt::new("e1", "l1", "m1", ExerciseType::Write, false, t0());
        store.record(&later).unwrap();
        store.record(&first).unwrap();
        store.record(&tie).unwrap();

        let ids: Vec<Uuid> = store.history("e1").unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, tie.id, later.id]);
        assert_eq!(store.best_outcomes_by_lesson("l1").unwrap()["e1"], true);
    }

    #[test]
    fn test_due_cards_filtered_and_sorted() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert_card(&card("b", t0() - Duration::hours(1))).unwrap();
        store.upsert_card(&card("a", t0() - Duration::days(2))).unwrap();
        store.upsert_card(&card("c", t0() + Duration::seconds(1))).unwrap();

        let due: Vec<String> = store
            .due_cards(t0())
            .unwrap()
            .into_iter()
            .map(|c| c.exercise_id)
            .collect();
        assert_eq!(due, vec!["a", "b"]);
    }

    #[test]
    fn test_oversized_time_spent_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let attempt = Attempt::new("e1", "l1", "m1", ExerciseType::Write, true, t0())
            .with_time_spent(u64::MAX);
        assert!(matches!(
            store.record(&attempt),
            Err(StorageError::InvalidValue(_))
        ));
        assert!(store.list_attempts().unwrap().is_empty());

        let largest = Attempt::new("e2", "l1", "m1", ExerciseType::Write, true, t0())
            .with_time_spent(i64::MAX as u64);
        store.record(&largest).unwrap();
        assert_eq!(store.history("e2").unwrap()[0].time_spent_ms, i64::MAX as u64);
    }

    #[test]
    fn test_upsert_replaces_card() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut stored = card("e1", t0());
        store.upsert_card(&stored).unwrap();
        stored.reps = 9;
        stored.last_review = None;
        store.upsert_card(&stored).unwrap();

        assert_eq!(store.list_cards().unwrap(), vec![stored]);
    }

    #[test]
    fn test_failed_transaction_is_rolled_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let result: Result<()> = store.atomically(|s| {
            s.record(&Attempt::new("e1", "l1", "m1", ExerciseType::Trace, true, t0()))?;
            s.set_level("loops", MasteryLevel::Learning, t0())?;
            Err(StorageError::Unavailable("simulated crash".to_string()))
        });

        assert!(result.is_err());
        assert!(store.list_attempts().unwrap().is_empty());
        assert!(store.list_mastery().unwrap().is_empty());

        let committed: Result<()> = store.atomically(|s| {
            s.atomically(|inner| inner.set_level("loops", MasteryLevel::Learning, t0()))
        });
        assert!(committed.is_ok());
        assert_eq!(store.list_mastery().unwrap().len(), 1);
    }
}
