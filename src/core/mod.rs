pub mod error;
pub mod types;
pub mod value;

pub use error::{ContextError, MigrationError, StoreError, StoreResult};
pub use types::{Column, DataType, Row, TableIdentity, WriteKind};
pub use value::Value;
