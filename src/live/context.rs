//! The context: one store, one registry, one change tracker.
//!
//! A context is constructed through the recovery controller, installs the
//! change-tracking interceptor (unless the target is read-only), and from
//! then on keeps every open live query fresh: each committed write is
//! analyzed against the registry and relevant registrations are refreshed on
//! independent tasks. Refresh failures surface only through the affected
//! registration's channel; they never touch the write that triggered them.

use crate::core::{ContextError, StoreResult};
use crate::live::analyzer::QueryDescription;
use crate::live::channel::{QuerySubscription, ResultChannel};
use crate::live::registry::{LiveQueryRegistry, QueryExecutor, Registration, RegistrationId};
use crate::migration::{Migration, MigrationFailurePolicy};
use crate::store::{Store, TransactionBatch, WriteEvent, WriteInterceptor};
use crate::target::PersistenceTarget;
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::{Arc, RwLock as StdRwLock, Weak};
use tracing::{debug, info, warn};

lazy_static! {
    /// The process-wide default context. Explicitly assigned once at
    /// startup via `Context::set_default`; never implicitly populated.
    static ref DEFAULT_CONTEXT: StdRwLock<Option<Context>> = StdRwLock::new(None);
}

/// Static configuration for opening a context.
pub struct ContextConfig {
    target: PersistenceTarget,
    migrations: Vec<Arc<dyn Migration>>,
    failure_policy: MigrationFailurePolicy,
    data_dir: PathBuf,
}

impl ContextConfig {
    pub fn new(target: PersistenceTarget) -> Self {
        Self {
            target,
            migrations: Vec::new(),
            failure_policy: MigrationFailurePolicy::Abort,
            data_dir: PathBuf::from("./data"),
        }
    }

    pub fn migration(mut self, migration: Arc<dyn Migration>) -> Self {
        self.migrations.push(migration);
        self
    }

    pub fn migrations(mut self, migrations: Vec<Arc<dyn Migration>>) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn failure_policy(mut self, policy: MigrationFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// The application-private directory file-backed snapshots live under.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

struct ContextShared {
    store: Store,
    registry: LiveQueryRegistry,
}

/// An isolated database context. Cheap to clone; all clones share the same
/// store and registry.
#[derive(Clone)]
pub struct Context {
    shared: Arc<ContextShared>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

impl Context {
    /// Construct a context: run recovery/migrations for the configured
    /// target, then install the mutation hook (or nothing, for read-only
    /// targets, whose stores already reject every write).
    pub async fn open(config: ContextConfig) -> Result<Context, ContextError> {
        let store = crate::migration::initialize(
            &config.target,
            &config.migrations,
            &config.failure_policy,
            &config.data_dir,
        )
        .await?;

        let shared = Arc::new(ContextShared {
            store: store.clone(),
            registry: LiveQueryRegistry::new(),
        });

        if !config.target.is_read_only() {
            store.add_interceptor(Arc::new(ChangeTracker {
                shared: Arc::downgrade(&shared),
            }));
        }

        info!(target = config.target.label(), "context ready");
        Ok(Context { shared })
    }

    /// Direct access to the owned store handle.
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    /// Install an additional write interceptor. Interceptors run in
    /// installation order, after the built-in change tracker.
    pub fn use_interceptor(&self, interceptor: Arc<dyn WriteInterceptor>) {
        self.shared.store.add_interceptor(interceptor);
    }

    /// Register a live query and schedule its first refresh. The call does
    /// not block on execution: the returned subscription starts out pending
    /// and its first delivered value is the first execution's result.
    pub async fn open_live_query(
        &self,
        description: QueryDescription,
        executor: QueryExecutor,
    ) -> (RegistrationId, QuerySubscription) {
        let (channel, subscription) = ResultChannel::new();
        let registration = Arc::new(Registration::new(description, executor, channel));
        let id = registration.id();

        self.shared.registry.insert(registration.clone()).await;
        debug!(registration = %id, "live query opened");
        spawn_refresh(self.shared.store.clone(), registration);

        (id, subscription)
    }

    /// Live query over a whole table: the executor scans the description's
    /// primary table.
    pub async fn open_table_query(
        &self,
        description: QueryDescription,
    ) -> (RegistrationId, QuerySubscription) {
        let table = description.primary_table().clone();
        let executor: QueryExecutor = Arc::new(move |store: Store| {
            let table = table.clone();
            Box::pin(async move { store.scan(&table).await })
        });
        self.open_live_query(description, executor).await
    }

    /// Close a live query. Idempotent: closing twice or closing an unknown
    /// id is a no-op, since concurrent teardown races are expected. An
    /// in-flight refresh may still complete; its result is discarded.
    pub async fn close_live_query(&self, id: RegistrationId) {
        if let Some(registration) = self.shared.registry.remove(id).await {
            registration.mark_closed();
            debug!(registration = %id, "live query closed");
        }
    }

    /// Run a batch of writes atomically. If `body` or the commit fails,
    /// nothing is applied and no invalidation runs; on success the mutation
    /// hook fires once per write, as if each had been performed standalone.
    pub async fn run_transaction<F>(&self, body: F) -> StoreResult<()>
    where
        F: FnOnce(&mut TransactionBatch) -> StoreResult<()>,
    {
        let mut batch = TransactionBatch::new();
        body(&mut batch)?;
        self.shared.store.commit(batch).await
    }

    pub async fn live_query_count(&self) -> usize {
        self.shared.registry.len().await
    }

    // ========================================================================
    // Default context
    // ========================================================================

    /// Assign the process-wide default context. Single-assignment: a second
    /// call fails instead of silently replacing the first.
    pub fn set_default(context: &Context) -> Result<(), ContextError> {
        let mut slot = DEFAULT_CONTEXT
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return Err(ContextError::DefaultAlreadySet);
        }
        *slot = Some(context.clone());
        Ok(())
    }

    pub fn default_context() -> Option<Context> {
        DEFAULT_CONTEXT
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Execute a registration's query on its own task and publish the outcome,
/// unless the registration was closed while the refresh was in flight.
fn spawn_refresh(store: Store, registration: Arc<Registration>) {
    tokio::spawn(async move {
        let result = (registration.executor())(store).await;
        if registration.is_closed() {
            return;
        }
        match result {
            Ok(rows) => registration.channel().publish(rows),
            Err(error) => {
                warn!(
                    registration = %registration.id(),
                    %error,
                    "live query refresh failed"
                );
                registration.channel().publish_error(error);
            }
        }
    });
}

/// The mutation hook: runs after every committed write, selects affected
/// registrations via the analyzer, and schedules their refreshes. Holds only
/// a weak back-reference to the context; once the context is torn down the
/// hook becomes a no-op.
struct ChangeTracker {
    shared: Weak<ContextShared>,
}

#[async_trait]
impl WriteInterceptor for ChangeTracker {
    async fn after_write(&self, event: &WriteEvent) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let affected = shared.registry.relevant_to(&event.table).await;
        debug!(
            table = %event.table,
            kind = %event.kind,
            affected = affected.len(),
            "write analyzed against live queries"
        );
        for registration in affected {
            spawn_refresh(shared.store.clone(), registration);
        }
    }
}
