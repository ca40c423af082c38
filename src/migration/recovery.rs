//! Startup recovery orchestration.
//!
//! Wraps the migration runner: produces either a ready store or a fatal
//! error, never a store in an unknown migration state.

use crate::core::{ContextError, MigrationError, StoreError};
use crate::migration::runner::{apply_migrations, Migration};
use crate::store::Store;
use crate::target::PersistenceTarget;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Invoked with the path of a store file that failed to migrate, before the
/// file is wiped, so the caller can copy it aside.
pub type BackupHandler = Arc<dyn Fn(&Path) + Send + Sync>;

/// What to do when a migration fails during context construction.
#[derive(Clone)]
pub enum MigrationFailurePolicy {
    /// Fail construction. The process must not continue with a partially
    /// migrated store.
    Abort,
    /// Delete the backing file and retry once from empty; a second failure
    /// is fatal. Only valid for file targets.
    StartFresh,
    /// Like `StartFresh`, but hands the failed file to the handler first.
    BackupAndStartFresh { handler: BackupHandler },
}

impl MigrationFailurePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::StartFresh => "start-fresh",
            Self::BackupAndStartFresh { .. } => "backup-and-start-fresh",
        }
    }
}

impl fmt::Debug for MigrationFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Open the store for `target`, apply migrations, and handle failure per the
/// policy. In-memory targets start empty, so only `Abort` makes sense for
/// them; bundles are pre-migrated and never run migrations at all.
pub async fn initialize(
    target: &PersistenceTarget,
    migrations: &[Arc<dyn Migration>],
    policy: &MigrationFailurePolicy,
    data_dir: &Path,
) -> Result<Store, ContextError> {
    if !matches!(policy, MigrationFailurePolicy::Abort) && !target.supports_deletion() {
        return Err(ContextError::IncompatiblePolicy {
            policy: policy.label(),
            target: target.label(),
        });
    }

    match target {
        PersistenceTarget::Memory => {
            let store = Store::in_memory();
            apply_migrations(&store, migrations).await?;
            Ok(store)
        }
        PersistenceTarget::Bundle { path } => {
            if !path.exists() {
                return Err(ContextError::BundleNotFound(path.display().to_string()));
            }
            Ok(Store::open_bundle(path)?)
        }
        PersistenceTarget::File { name } => {
            let path = PersistenceTarget::resolve_file_path(name, data_dir)?;
            let store = Store::open_file(&path)?;
            match apply_migrations(&store, migrations).await {
                Ok(applied) => {
                    info!(applied, path = %path.display(), "store migrated and ready");
                    Ok(store)
                }
                Err(original) => match policy {
                    MigrationFailurePolicy::Abort => Err(ContextError::Migration(original)),
                    MigrationFailurePolicy::StartFresh => {
                        start_fresh(&path, migrations, original).await
                    }
                    MigrationFailurePolicy::BackupAndStartFresh { handler } => {
                        warn!(path = %path.display(), "handing failed store to backup handler");
                        handler(&path);
                        start_fresh(&path, migrations, original).await
                    }
                },
            }
        }
    }
}

/// Wipe the backing file and retry exactly once; both errors are reported
/// together if the retry fails as well.
async fn start_fresh(
    path: &Path,
    migrations: &[Arc<dyn Migration>],
    original: MigrationError,
) -> Result<Store, ContextError> {
    warn!(
        path = %path.display(),
        error = %original,
        "migration failed, wiping store and retrying from empty"
    );
    if path.exists() {
        fs::remove_file(path).map_err(|e| ContextError::Store(StoreError::from(e)))?;
    }
    let store = Store::open_file(path)?;
    match apply_migrations(&store, migrations).await {
        Ok(_) => Ok(store),
        Err(retry) => Err(ContextError::FatalRecovery { original, retry }),
    }
}
