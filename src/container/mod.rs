pub mod key;
pub mod lifetime;
pub mod registry;
pub mod scope;

pub use key::ServiceKey;
pub use lifetime::ServiceLifetime;
pub use registry::{RegistryStatistics, ServiceRegistry};
pub use scope::ServiceScope;
