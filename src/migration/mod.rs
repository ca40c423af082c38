pub mod recovery;
pub mod runner;

pub use recovery::{initialize, BackupHandler, MigrationFailurePolicy};
pub use runner::{apply_migrations, CreateTable, Migration, MigrationLedger, MigrationRecord};
