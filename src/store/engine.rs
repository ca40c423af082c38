//! The store handle.
//!
//! `Store` is a cheaply cloneable handle over the shared store state. All
//! table state lives behind a single async write lock, so mutations are
//! fully serialized; the store is never touched concurrently. Row writes run
//! through the interceptor chain: `before_write` can reject a batch,
//! `after_write` fires once per committed write.

use crate::core::{Row, StoreError, StoreResult, TableIdentity};
use crate::migration::{MigrationLedger, MigrationRecord};
use crate::store::observer::{WriteEvent, WriteInterceptor};
use crate::store::snapshot::StoreSnapshot;
use crate::store::table::{Table, TableSchema};
use crate::store::transaction::{PendingWrite, TransactionBatch};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;
use tracing::debug;

struct StoreState {
    tables: HashMap<TableIdentity, Table>,
    ledger: MigrationLedger,
}

struct StoreInner {
    state: RwLock<StoreState>,
    /// Ordered interceptor chain, invoked sequentially. Guarded separately
    /// from the state so the chain can run without holding the table lock.
    interceptors: StdRwLock<Vec<Arc<dyn WriteInterceptor>>>,
    file_path: Option<PathBuf>,
    read_only: bool,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// A fresh, empty store with no persistence. Always starts empty; nothing
    /// survives the process.
    pub fn in_memory() -> Self {
        Self::from_parts(HashMap::new(), MigrationLedger::default(), None, false)
    }

    /// A file-backed store. Loads the snapshot at `path` if one exists,
    /// otherwise starts empty; every committed write is persisted back.
    pub fn open_file(path: &Path) -> StoreResult<Self> {
        let (tables, ledger) = match StoreSnapshot::load(path)? {
            Some(snapshot) => (snapshot.tables, snapshot.ledger),
            None => (HashMap::new(), MigrationLedger::default()),
        };
        Ok(Self::from_parts(
            tables,
            ledger,
            Some(path.to_path_buf()),
            false,
        ))
    }

    /// A read-only store loaded from a pre-migrated bundled snapshot.
    /// Every row write is rejected by the installed guard.
    pub fn open_bundle(path: &Path) -> StoreResult<Self> {
        let snapshot = StoreSnapshot::load(path)?.ok_or_else(|| {
            StoreError::IoError(format!("Bundled snapshot not found at '{}'", path.display()))
        })?;
        let store = Self::from_parts(snapshot.tables, snapshot.ledger, None, true);
        store.add_interceptor(Arc::new(crate::store::observer::ReadOnlyGuard));
        Ok(store)
    }

    fn from_parts(
        tables: HashMap<TableIdentity, Table>,
        ledger: MigrationLedger,
        file_path: Option<PathBuf>,
        read_only: bool,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState { tables, ledger }),
                interceptors: StdRwLock::new(Vec::new()),
                file_path,
                read_only,
            }),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Append an interceptor to the chain. Interceptors run in installation
    /// order.
    pub fn add_interceptor(&self, interceptor: Arc<dyn WriteInterceptor>) {
        let mut chain = self
            .inner
            .interceptors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chain.push(interceptor);
    }

    fn interceptor_chain(&self) -> Vec<Arc<dyn WriteInterceptor>> {
        self.inner
            .interceptors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ========================================================================
    // DDL
    // ========================================================================

    pub async fn create_table(&self, schema: TableSchema) -> StoreResult<()> {
        if self.inner.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut state = self.inner.state.write().await;
        let identity = schema.identity().clone();
        if state.tables.contains_key(&identity) {
            return Err(StoreError::TableExists(identity.to_string()));
        }
        let mut tables = state.tables.clone();
        tables.insert(identity, Table::new(schema));
        self.persist(&tables, &state.ledger)?;
        state.tables = tables;
        Ok(())
    }

    pub async fn drop_table(&self, identity: &TableIdentity) -> StoreResult<()> {
        if self.inner.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut state = self.inner.state.write().await;
        if !state.tables.contains_key(identity) {
            return Err(StoreError::TableNotFound(identity.to_string()));
        }
        let mut tables = state.tables.clone();
        tables.remove(identity);
        self.persist(&tables, &state.ledger)?;
        state.tables = tables;
        Ok(())
    }

    pub async fn table_exists(&self, identity: &TableIdentity) -> bool {
        self.inner.state.read().await.tables.contains_key(identity)
    }

    pub async fn list_tables(&self) -> Vec<TableIdentity> {
        self.inner.state.read().await.tables.keys().cloned().collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All rows of a table that are not soft-deleted.
    pub async fn scan(&self, identity: &TableIdentity) -> StoreResult<Vec<Row>> {
        let state = self.inner.state.read().await;
        let table = state
            .tables
            .get(identity)
            .ok_or_else(|| StoreError::TableNotFound(identity.to_string()))?;
        Ok(table.live_rows())
    }

    /// All rows of a table, including soft-deleted ones.
    pub async fn scan_with_deleted(&self, identity: &TableIdentity) -> StoreResult<Vec<Row>> {
        let state = self.inner.state.read().await;
        let table = state
            .tables
            .get(identity)
            .ok_or_else(|| StoreError::TableNotFound(identity.to_string()))?;
        Ok(table.all_rows())
    }

    pub async fn row_count(&self, identity: &TableIdentity) -> StoreResult<usize> {
        let state = self.inner.state.read().await;
        let table = state
            .tables
            .get(identity)
            .ok_or_else(|| StoreError::TableNotFound(identity.to_string()))?;
        Ok(table.row_count())
    }

    // ========================================================================
    // Row writes
    // ========================================================================

    pub async fn insert(&self, table: &TableIdentity, values: Row) -> StoreResult<u64> {
        let events = self
            .apply_writes(vec![PendingWrite::Create {
                table: table.clone(),
                values,
            }])
            .await?;
        Ok(events[0].row_id)
    }

    pub async fn update(&self, table: &TableIdentity, row_id: u64, values: Row) -> StoreResult<()> {
        self.apply_writes(vec![PendingWrite::Update {
            table: table.clone(),
            row_id,
            values,
        }])
        .await?;
        Ok(())
    }

    pub async fn soft_delete(&self, table: &TableIdentity, row_id: u64) -> StoreResult<()> {
        self.apply_writes(vec![PendingWrite::SoftDelete {
            table: table.clone(),
            row_id,
        }])
        .await?;
        Ok(())
    }

    pub async fn restore(&self, table: &TableIdentity, row_id: u64) -> StoreResult<()> {
        self.apply_writes(vec![PendingWrite::Restore {
            table: table.clone(),
            row_id,
        }])
        .await?;
        Ok(())
    }

    pub async fn hard_delete(&self, table: &TableIdentity, row_id: u64) -> StoreResult<()> {
        self.apply_writes(vec![PendingWrite::HardDelete {
            table: table.clone(),
            row_id,
        }])
        .await?;
        Ok(())
    }

    /// Apply a batch atomically: either every write commits or none does.
    /// Post-commit, the interceptor chain is notified once per write in
    /// declared order.
    pub async fn commit(&self, batch: TransactionBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.apply_writes(batch.into_writes()).await?;
        Ok(())
    }

    async fn apply_writes(&self, writes: Vec<PendingWrite>) -> StoreResult<Vec<WriteEvent>> {
        let chain = self.interceptor_chain();
        for write in &writes {
            for interceptor in &chain {
                interceptor.before_write(write.kind(), write.table()).await?;
            }
        }

        let events = {
            let mut state = self.inner.state.write().await;
            // All-or-nothing: mutate a copy, persist it, then install it.
            let mut tables = state.tables.clone();
            let mut events = Vec::with_capacity(writes.len());
            for write in writes {
                events.push(Self::apply_one(&mut tables, write)?);
            }
            self.persist(&tables, &state.ledger)?;
            state.tables = tables;
            events
        };

        for event in &events {
            debug!(kind = %event.kind, table = %event.table, row_id = event.row_id, "row write committed");
            for interceptor in &chain {
                interceptor.after_write(event).await;
            }
        }
        Ok(events)
    }

    fn apply_one(
        tables: &mut HashMap<TableIdentity, Table>,
        write: PendingWrite,
    ) -> StoreResult<WriteEvent> {
        let kind = write.kind();
        let identity = write.table().clone();
        let table = tables
            .get_mut(&identity)
            .ok_or_else(|| StoreError::TableNotFound(identity.to_string()))?;

        let row_id = match write {
            PendingWrite::Create { values, .. } => table.insert(values)?,
            PendingWrite::Update { row_id, values, .. } => {
                table.update(row_id, values)?;
                row_id
            }
            PendingWrite::SoftDelete { row_id, .. } => {
                table.soft_delete(row_id)?;
                row_id
            }
            PendingWrite::Restore { row_id, .. } => {
                table.restore(row_id)?;
                row_id
            }
            PendingWrite::HardDelete { row_id, .. } => {
                table.hard_delete(row_id)?;
                row_id
            }
        };

        Ok(WriteEvent {
            kind,
            table: identity,
            row_id,
        })
    }

    fn persist(&self, tables: &HashMap<TableIdentity, Table>, ledger: &MigrationLedger) -> StoreResult<()> {
        let Some(path) = &self.inner.file_path else {
            return Ok(());
        };
        StoreSnapshot::new(tables.clone(), ledger.clone()).save(path)
    }

    // ========================================================================
    // Migration ledger
    // ========================================================================

    pub async fn is_migration_applied(&self, name: &str) -> bool {
        self.inner.state.read().await.ledger.contains(name)
    }

    pub async fn applied_migrations(&self) -> Vec<MigrationRecord> {
        self.inner.state.read().await.ledger.records().to_vec()
    }

    pub(crate) async fn record_migration(&self, name: &str) -> StoreResult<()> {
        let mut state = self.inner.state.write().await;
        let mut ledger = state.ledger.clone();
        ledger.record(name);
        self.persist(&state.tables, &ledger)?;
        state.ledger = ledger;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};
    use tempfile::TempDir;

    fn projects_schema() -> TableSchema {
        TableSchema::new(
            TableIdentity::new("projects"),
            vec![Column::new("name", DataType::Text).not_null()],
        )
    }

    #[tokio::test]
    async fn test_create_insert_scan() {
        let store = Store::in_memory();
        store.create_table(projects_schema()).await.unwrap();

        let table = TableIdentity::new("projects");
        store.insert(&table, vec![Value::from("Groceries")]).await.unwrap();

        let rows = store.scan(&table).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::from("Groceries"));
    }

    #[tokio::test]
    async fn test_duplicate_create_table_fails() {
        let store = Store::in_memory();
        store.create_table(projects_schema()).await.unwrap();
        assert!(matches!(
            store.create_table(projects_schema()).await,
            Err(StoreError::TableExists(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_table() {
        let store = Store::in_memory();
        store.create_table(projects_schema()).await.unwrap();
        let table = TableIdentity::new("projects");
        store.drop_table(&table).await.unwrap();
        assert!(!store.table_exists(&table).await);
        assert!(matches!(
            store.drop_table(&table).await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_commit_is_atomic() {
        let store = Store::in_memory();
        store.create_table(projects_schema()).await.unwrap();
        let table = TableIdentity::new("projects");

        // Second write targets a missing table, so the first must not land.
        let mut batch = TransactionBatch::new();
        batch.create(table.clone(), vec![Value::from("Groceries")]);
        batch.create(TableIdentity::new("missing"), vec![Value::from("x")]);

        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.scan(&table).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("projects.store");

        {
            let store = Store::open_file(&path).unwrap();
            store.create_table(projects_schema()).await.unwrap();
            store
                .insert(&TableIdentity::new("projects"), vec![Value::from("Groceries")])
                .await
                .unwrap();
        }

        let reopened = Store::open_file(&path).unwrap();
        let rows = reopened.scan(&TableIdentity::new("projects")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_bundle_store_rejects_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bundle.store");

        {
            let store = Store::open_file(&path).unwrap();
            store.create_table(projects_schema()).await.unwrap();
        }

        let bundle = Store::open_bundle(&path).unwrap();
        assert!(bundle.is_read_only());
        let table = TableIdentity::new("projects");
        assert_eq!(
            bundle.insert(&table, vec![Value::from("Groceries")]).await,
            Err(StoreError::ReadOnly)
        );
        assert!(matches!(
            bundle.create_table(projects_schema()).await,
            Err(StoreError::ReadOnly)
        ));
        // Reads still work.
        assert_eq!(bundle.scan(&table).await.unwrap().len(), 0);
    }
}
