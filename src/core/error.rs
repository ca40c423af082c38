use thiserror::Error;

/// Errors surfacing from individual store operations.
///
/// These are recoverable per-operation: a failed query or write never takes
/// down the owning context. For live queries the error is delivered into the
/// registration's result channel as a terminal failed state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Row {1} not found in table '{0}'")]
    RowNotFound(String, u64),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Write rejected: store is read-only")]
    ReadOnly,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// A migration that failed to prepare.
///
/// Only ever produced during context construction; the recovery controller
/// decides what happens next based on the configured failure policy.
#[derive(Error, Debug, Clone)]
#[error("Migration '{name}' failed: {source}")]
pub struct MigrationError {
    pub name: String,
    #[source]
    pub source: StoreError,
}

/// Fatal errors raised while constructing a context.
///
/// None of these are retryable: a store that cannot be trusted must not be
/// used, so construction either yields a ready store or fails for good.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid persistence name '{0}'")]
    InvalidPersistenceName(String),

    #[error("Recovery policy '{policy}' is not supported for {target} persistence")]
    IncompatiblePolicy {
        policy: &'static str,
        target: &'static str,
    },

    #[error("Bundled store not found at '{0}'")]
    BundleNotFound(String),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("{original}; retry after wiping the store also failed: {retry}")]
    FatalRecovery {
        original: MigrationError,
        retry: MigrationError,
    },

    #[error("Store error during initialization: {0}")]
    Store(#[from] StoreError),

    #[error("A default context has already been set")]
    DefaultAlreadySet,
}
