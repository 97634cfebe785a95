pub mod backup;
mod memory;
mod repository;
mod snapshot;
mod sqlite;

pub use memory::{MemoryStore, Table};
pub use repository::*;
pub use snapshot::{export_snapshot, import_snapshot, Snapshot, SNAPSHOT_FORMAT_VERSION};
pub use sqlite::SqliteStore;
