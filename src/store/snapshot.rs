//! Binary snapshot persistence for file-backed stores.
//!
//! The whole store state (tables plus migration ledger) is serialized with
//! MessagePack and written atomically: into a temp file in the target
//! directory, then renamed over the destination.

use crate::core::{StoreError, StoreResult, TableIdentity};
use crate::migration::MigrationLedger;
use crate::store::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub tables: HashMap<TableIdentity, Table>,
    pub ledger: MigrationLedger,
}

impl StoreSnapshot {
    pub fn new(tables: HashMap<TableIdentity, Table>, ledger: MigrationLedger) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tables,
            ledger,
        }
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::IoError(format!("Failed to create data directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(self)
            .map_err(|e| StoreError::SerializationError(format!("Failed to serialize snapshot: {}", e)))?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| StoreError::IoError(format!("Failed to create temp snapshot: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| StoreError::IoError(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(path)
            .map_err(|e| StoreError::IoError(format!("Failed to persist snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(path: &Path) -> StoreResult<Option<StoreSnapshot>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)
            .map_err(|e| StoreError::IoError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data).map_err(|e| {
            StoreError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
        })?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};
    use crate::store::table::TableSchema;
    use tempfile::TempDir;

    fn sample_tables() -> HashMap<TableIdentity, Table> {
        let identity = TableIdentity::new("projects");
        let mut table = Table::new(TableSchema::new(
            identity.clone(),
            vec![Column::new("name", DataType::Text)],
        ));
        table.insert(vec![Value::from("Groceries")]).unwrap();
        let mut tables = HashMap::new();
        tables.insert(identity, table);
        tables
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.store");

        let snapshot = StoreSnapshot::new(sample_tables(), MigrationLedger::default());
        snapshot.save(&path).unwrap();

        let loaded = StoreSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        let table = loaded.tables.get(&TableIdentity::new("projects")).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.store");
        assert!(StoreSnapshot::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.store");
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(matches!(
            StoreSnapshot::load(&path),
            Err(StoreError::SerializationError(_))
        ));
    }
}
