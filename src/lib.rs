//! Minimal service composition engine: a manual-registration service registry
//! paired with bounded-lifetime scopes.
//!
//! Bindings come in three lifetimes: singleton instances, transient factories
//! invoked fresh on every resolution, and scoped factories invoked at most
//! once per [`ServiceScope`]. Scopes cache their scoped products, track every
//! instance they created that exposes a [`Disposable`] capability, and release
//! those instances when the scope ends - on explicit disposal or on drop.
//!
//! ```
//! use std::sync::Arc;
//! use scoped_di::{Service, ServiceRegistry};
//!
//! struct Clock;
//! impl Service for Clock {}
//!
//! struct Session;
//! impl Service for Session {}
//!
//! # fn main() -> Result<(), scoped_di::DiError> {
//! let registry = Arc::new(ServiceRegistry::new());
//! registry.register_singleton(Clock)?;
//! registry.register_scoped(|| Session)?;
//!
//! let scope = registry.create_scope()?;
//! let session = scope.resolve::<Session>()?;
//! let again = scope.resolve::<Session>()?;
//! assert!(Arc::ptr_eq(&session, &again));
//!
//! scope.dispose();
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod errors;
pub mod service;

pub use container::{
    RegistryStatistics, ServiceKey, ServiceLifetime, ServiceRegistry, ServiceScope,
};
pub use errors::DiError;
pub use service::{Disposable, Service};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
