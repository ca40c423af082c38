//! Write interceptor chain.
//!
//! Interceptors are an ordered list of capability objects invoked
//! sequentially around every row write: `before_write` runs ahead of the
//! batch (the first error rejects the whole batch), `after_write` runs once
//! per write after the batch has committed. Failures inside `after_write`
//! cannot exist by construction; the hook is infallible and must never roll
//! back or otherwise affect the write that triggered it.

use crate::core::{StoreResult, TableIdentity, WriteKind};
use async_trait::async_trait;

/// A committed row write, as reported to `after_write`.
#[derive(Debug, Clone)]
pub struct WriteEvent {
    pub kind: WriteKind,
    pub table: TableIdentity,
    pub row_id: u64,
}

#[async_trait]
pub trait WriteInterceptor: Send + Sync {
    /// Called before a write is applied. Returning an error rejects the
    /// write (and the whole batch it belongs to) without touching the store.
    async fn before_write(&self, _kind: WriteKind, _table: &TableIdentity) -> StoreResult<()> {
        Ok(())
    }

    /// Called after a write has committed and, for file-backed stores,
    /// been made durable.
    async fn after_write(&self, _event: &WriteEvent) {}
}

/// Rejects every row write with `StoreError::ReadOnly`.
///
/// Installed automatically on stores opened from a read-only bundle, so no
/// write ever commits and no invalidation runs.
pub struct ReadOnlyGuard;

#[async_trait]
impl WriteInterceptor for ReadOnlyGuard {
    async fn before_write(&self, _kind: WriteKind, _table: &TableIdentity) -> StoreResult<()> {
        Err(crate::core::StoreError::ReadOnly)
    }
}
