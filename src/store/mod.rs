pub mod engine;
pub mod observer;
pub mod snapshot;
pub mod table;
pub mod transaction;

pub use engine::Store;
pub use observer::{ReadOnlyGuard, WriteEvent, WriteInterceptor};
pub use snapshot::StoreSnapshot;
pub use table::{Table, TableSchema};
pub use transaction::{PendingWrite, TransactionBatch};
