pub mod accounts;
pub mod concepts;
pub mod engagement;
pub mod registry;
pub mod storage;

use crate::database::QueryService;

pub use accounts::AccountsService;
pub use concepts::ConceptsService;
pub use engagement::EngagementService;
pub use registry::{ServiceBox, ServiceName, ServiceRegistry};
pub use storage::{MemoryObjectStore, ObjectStore, PublicBucket, StorageError};

/// Providers that run their statements through a query service
pub trait DataService {
    fn queries(&mut self) -> &mut QueryService;
}
