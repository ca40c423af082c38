// ============================================================================
// LiveStore Library
// ============================================================================

//! Embedded relational store with live queries.
//!
//! A [`Context`] owns one store, constructed through a migration runner with
//! a configurable recovery policy, and keeps registered live queries fresh:
//! every committed write is analyzed against the open registrations and the
//! affected ones are re-executed asynchronously, publishing new snapshots
//! into their result channels.
//!
//! # Examples
//!
//! ```
//! use livestore::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let projects = TableIdentity::new("projects");
//! let config = ContextConfig::new(PersistenceTarget::Memory)
//!     .migration(Arc::new(CreateTable::new(TableSchema::new(
//!         projects.clone(),
//!         vec![Column::new("name", DataType::Text).not_null()],
//!     ))));
//! let context = Context::open(config).await.unwrap();
//!
//! // The first delivered value is the first execution's result.
//! let (id, mut subscription) = context
//!     .open_table_query(QueryDescription::table(projects.clone()))
//!     .await;
//! let state = subscription.wait_ready().await.unwrap();
//! assert!(state.rows().unwrap().is_empty());
//!
//! // A write to the observed table refreshes the query.
//! context
//!     .store()
//!     .insert(&projects, vec![Value::from("Groceries")])
//!     .await
//!     .unwrap();
//! let state = subscription.changed().await.unwrap();
//! assert_eq!(state.rows().unwrap().len(), 1);
//!
//! context.close_live_query(id).await;
//! # });
//! ```

pub mod core;
pub mod live;
pub mod migration;
pub mod prelude;
pub mod store;
pub mod target;

// Re-export main types for convenience
pub use crate::core::{
    Column, ContextError, DataType, MigrationError, Row, StoreError, StoreResult, TableIdentity,
    Value, WriteKind,
};
pub use live::{
    is_relevant, Context, ContextConfig, JoinDescription, JoinKind, LiveQueryRegistry,
    QueryDescription, QueryExecutor, QueryState, QuerySubscription, Registration, RegistrationId,
    ResultChannel,
};
pub use migration::{
    apply_migrations, BackupHandler, CreateTable, Migration, MigrationFailurePolicy,
    MigrationLedger, MigrationRecord,
};
pub use store::{
    PendingWrite, Store, StoreSnapshot, Table, TableSchema, TransactionBatch, WriteEvent,
    WriteInterceptor,
};
pub use target::PersistenceTarget;
