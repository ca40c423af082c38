//! Ordered, idempotent migration application.
//!
//! Migrations already present in the store's ledger are skipped; the rest run
//! in declared order. The first failure aborts the batch and leaves prior
//! migrations committed; deciding what to do about the partial state is the
//! recovery controller's job, not the runner's.

use crate::core::{MigrationError, StoreResult};
use crate::store::{Store, TableSchema};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait Migration: Send + Sync {
    /// Stable name, used as the ledger key. Renaming an already-applied
    /// migration makes it run again.
    fn name(&self) -> &str;

    /// Apply the migration against the store.
    async fn prepare(&self, store: &Store) -> StoreResult<()>;

    /// Reverting is not part of this design; calling this is a programming
    /// error, not a recoverable failure.
    async fn revert(&self, _store: &Store) -> StoreResult<()> {
        panic!("migration '{}' does not support revert", self.name());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// The persisted record of which migrations have run, stored alongside the
/// table state so it survives restarts of file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationLedger {
    records: Vec<MigrationRecord>,
}

impl MigrationLedger {
    pub fn contains(&self, name: &str) -> bool {
        self.records.iter().any(|record| record.name == name)
    }

    pub fn record(&mut self, name: &str) {
        self.records.push(MigrationRecord {
            name: name.to_string(),
            applied_at: Utc::now(),
        });
    }

    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Run every unapplied migration in declared order. Returns how many were
/// applied this call; already-applied ones are skipped via the ledger.
pub async fn apply_migrations(
    store: &Store,
    migrations: &[Arc<dyn Migration>],
) -> Result<usize, MigrationError> {
    let mut applied = 0;
    for migration in migrations {
        let name = migration.name();
        if store.is_migration_applied(name).await {
            debug!(migration = name, "migration already applied, skipping");
            continue;
        }
        info!(migration = name, "applying migration");
        let wrap = |source| MigrationError {
            name: name.to_string(),
            source,
        };
        migration.prepare(store).await.map_err(wrap)?;
        store.record_migration(name).await.map_err(wrap)?;
        applied += 1;
    }
    Ok(applied)
}

/// Stock migration that creates one table.
pub struct CreateTable {
    name: String,
    schema: TableSchema,
}

impl CreateTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            name: format!("create_table_{}", schema.identity()),
            schema,
        }
    }
}

#[async_trait]
impl Migration for CreateTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, store: &Store) -> StoreResult<()> {
        store.create_table(self.schema.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, StoreError, TableIdentity};

    struct FailingMigration;

    #[async_trait]
    impl Migration for FailingMigration {
        fn name(&self) -> &str {
            "failing"
        }

        async fn prepare(&self, _store: &Store) -> StoreResult<()> {
            Err(StoreError::ConstraintViolation("boom".into()))
        }
    }

    fn create_projects() -> Arc<dyn Migration> {
        Arc::new(CreateTable::new(TableSchema::new(
            TableIdentity::new("projects"),
            vec![Column::new("name", DataType::Text)],
        )))
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let store = Store::in_memory();
        let migrations = vec![create_projects()];

        assert_eq!(apply_migrations(&store, &migrations).await.unwrap(), 1);
        assert_eq!(apply_migrations(&store, &migrations).await.unwrap(), 0);
        assert_eq!(store.applied_migrations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_first_failure_aborts_batch_keeping_prior() {
        let store = Store::in_memory();
        let migrations: Vec<Arc<dyn Migration>> = vec![
            create_projects(),
            Arc::new(FailingMigration),
            Arc::new(CreateTable::new(TableSchema::new(
                TableIdentity::new("tasks"),
                vec![Column::new("title", DataType::Text)],
            ))),
        ];

        let err = apply_migrations(&store, &migrations).await.unwrap_err();
        assert_eq!(err.name, "failing");

        // First migration committed, third never ran.
        assert!(store.table_exists(&TableIdentity::new("projects")).await);
        assert!(!store.table_exists(&TableIdentity::new("tasks")).await);
        assert_eq!(store.applied_migrations().await.len(), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "does not support revert")]
    async fn test_revert_is_a_programming_error() {
        let store = Store::in_memory();
        let _ = CreateTable::new(TableSchema::new(
            TableIdentity::new("projects"),
            vec![Column::new("name", DataType::Text)],
        ))
        .revert(&store)
        .await;
    }
}
