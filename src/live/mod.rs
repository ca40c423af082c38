pub mod analyzer;
pub mod channel;
pub mod context;
pub mod registry;

pub use analyzer::{is_relevant, JoinDescription, JoinKind, QueryDescription};
pub use channel::{QueryState, QuerySubscription, ResultChannel};
pub use context::{Context, ContextConfig};
pub use registry::{LiveQueryRegistry, QueryExecutor, Registration, RegistrationId};
