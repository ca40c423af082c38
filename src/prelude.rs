//! Convenience re-exports for the common path.

pub use crate::core::{
    Column, ContextError, DataType, Row, StoreError, StoreResult, TableIdentity, Value, WriteKind,
};
pub use crate::live::{
    Context, ContextConfig, JoinKind, QueryDescription, QueryState, QuerySubscription,
    RegistrationId,
};
pub use crate::migration::{CreateTable, Migration, MigrationFailurePolicy};
pub use crate::store::{Store, TableSchema, TransactionBatch};
pub use crate::target::PersistenceTarget;
