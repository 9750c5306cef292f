//! Reference adapters for the collaborator ports.

pub mod accounts;
pub mod notifier;
pub mod session;
pub mod storage;
pub mod transport;

pub use accounts::ConfiguredAccountResolver;
pub use notifier::FlashNotifier;
pub use session::{InMemorySessionStore, SessionLimits};
pub use storage::{InMemoryPgtStore, SeaOrmPgtStore};
pub use transport::HyperTransport;
