//! Registry of open live queries.

use crate::core::{Row, StoreResult, TableIdentity};
use crate::live::analyzer::{is_relevant, QueryDescription};
use crate::live::channel::ResultChannel;
use crate::store::Store;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque identity of one open live query, generated per open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Re-execution capability of a live query: given a store handle, produce
/// the current result rows.
pub type QueryExecutor =
    Arc<dyn Fn(Store) -> BoxFuture<'static, StoreResult<Vec<Row>>> + Send + Sync>;

/// The live, in-memory record of one open live query.
///
/// Owns the query description, the re-execution closure and the result
/// channel. The closed flag is the cancellation primitive: refresh tasks
/// consult it before publishing, so a refresh finishing after close is
/// silently discarded.
pub struct Registration {
    id: RegistrationId,
    description: QueryDescription,
    executor: QueryExecutor,
    channel: ResultChannel,
    closed: AtomicBool,
}

impl Registration {
    pub(crate) fn new(
        description: QueryDescription,
        executor: QueryExecutor,
        channel: ResultChannel,
    ) -> Self {
        Self {
            id: RegistrationId::generate(),
            description,
            executor,
            channel,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn description(&self) -> &QueryDescription {
        &self.description
    }

    pub(crate) fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub(crate) fn channel(&self) -> &ResultChannel {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Mapping from registration id to registration. Mutated only by open and
/// close; the mutation hook reads it copy-then-iterate, so iteration
/// tolerates concurrent opens and closes.
pub struct LiveQueryRegistry {
    entries: RwLock<HashMap<RegistrationId, Arc<Registration>>>,
}

impl LiveQueryRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, registration: Arc<Registration>) {
        let mut entries = self.entries.write().await;
        entries.insert(registration.id(), registration);
    }

    pub async fn remove(&self, id: RegistrationId) -> Option<Arc<Registration>> {
        let mut entries = self.entries.write().await;
        entries.remove(&id)
    }

    /// Registrations whose query must refresh after a write to `table`.
    pub async fn relevant_to(&self, table: &TableIdentity) -> Vec<Arc<Registration>> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|registration| is_relevant(table, registration.description()))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for LiveQueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
