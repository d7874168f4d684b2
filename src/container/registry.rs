use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::container::key::ServiceKey;
use crate::container::lifetime::ServiceLifetime;
use crate::container::scope::ServiceScope;
use crate::errors::DiError;
use crate::service::{Disposable, Service};

/// A constructed instance paired with the disposal capability captured when
/// its factory was registered.
pub(crate) struct ResolvedInstance {
    pub(crate) instance: Arc<dyn Any + Send + Sync>,
    pub(crate) disposable: Option<Arc<dyn Disposable>>,
}

/// Factory function for creating service instances.
///
/// Shared so a factory can be invoked after the bindings lock is released;
/// a factory that re-enters the registry never runs under a held guard.
type InstanceFactory = Arc<dyn Fn() -> ResolvedInstance + Send + Sync>;

struct FactoryEntry {
    lifetime: ServiceLifetime,
    factory: InstanceFactory,
}

impl std::fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("lifetime", &self.lifetime)
            .field("factory", &"<factory_fn>")
            .finish()
    }
}

/// Registry for service bindings across three lifetimes.
///
/// The registry owns singleton instances and constructor functions for its
/// own lifetime. Instances produced by factories are owned by whichever scope
/// or caller requested them. Scoped bindings are resolvable only through a
/// [`ServiceScope`] created via [`ServiceRegistry::create_scope`].
///
/// Singleton keys and factory keys live in independent mappings; transient
/// and scoped factories share one key space, so a key cannot be registered
/// under both of those lifetimes.
pub struct ServiceRegistry {
    singletons: RwLock<HashMap<ServiceKey, Arc<dyn Any + Send + Sync>>>,
    factories: RwLock<HashMap<ServiceKey, FactoryEntry>>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field(
                "singleton_count",
                &self.singletons.read().map(|m| m.len()).unwrap_or(0),
            )
            .field(
                "factory_count",
                &self.factories.read().map(|m| m.len()).unwrap_or(0),
            )
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ServiceRegistry {
    /// Create a new empty service registry
    pub fn new() -> Self {
        Self {
            singletons: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Register a singleton service keyed by its type
    pub fn register_singleton<T: Service>(&self, service: T) -> Result<(), DiError> {
        self.register_singleton_keyed(ServiceKey::of::<T>(), service)
    }

    /// Register a singleton service under a name
    pub fn register_singleton_named<T: Service>(
        &self,
        name: impl Into<String>,
        service: T,
    ) -> Result<(), DiError> {
        self.register_singleton_keyed(named_key(name)?, service)
    }

    /// Register a transient factory keyed by its product type.
    ///
    /// The factory runs with no registry lock held, so it may resolve its own
    /// dependencies through the registry.
    pub fn register_transient<T, F>(&self, factory: F) -> Result<(), DiError>
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory_keyed(ServiceKey::of::<T>(), ServiceLifetime::Transient, factory)
    }

    /// Register a transient factory under a name
    pub fn register_transient_named<T, F>(
        &self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), DiError>
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory_keyed(named_key(name)?, ServiceLifetime::Transient, factory)
    }

    /// Register a scoped factory keyed by its product type.
    ///
    /// The factory is invoked at most once per scope; its product is cached by
    /// the resolving scope for that scope's lifetime. As with transient
    /// factories, it runs with no registry lock held.
    pub fn register_scoped<T, F>(&self, factory: F) -> Result<(), DiError>
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory_keyed(ServiceKey::of::<T>(), ServiceLifetime::Scoped, factory)
    }

    /// Register a scoped factory under a name
    pub fn register_scoped_named<T, F>(
        &self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), DiError>
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory_keyed(named_key(name)?, ServiceLifetime::Scoped, factory)
    }

    fn register_singleton_keyed<T: Service>(
        &self,
        key: ServiceKey,
        service: T,
    ) -> Result<(), DiError> {
        self.ensure_live()?;
        let mut singletons = self
            .singletons
            .write()
            .map_err(|_| DiError::lock("singleton_bindings"))?;

        if singletons.contains_key(&key) {
            return Err(DiError::duplicate_registration(
                key.display_name(),
                ServiceLifetime::Singleton,
            ));
        }

        tracing::debug!(key = %key, "registering singleton service");
        singletons.insert(key, Arc::new(service));
        Ok(())
    }

    fn register_factory_keyed<T, F>(
        &self,
        key: ServiceKey,
        lifetime: ServiceLifetime,
        factory: F,
    ) -> Result<(), DiError>
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let mut factories = self
            .factories
            .write()
            .map_err(|_| DiError::lock("factory_bindings"))?;

        if let Some(existing) = factories.get(&key) {
            return Err(DiError::duplicate_registration(
                key.display_name(),
                existing.lifetime,
            ));
        }

        // The disposal capability is captured per construction, so each
        // product carries its own handle.
        let wrapped: InstanceFactory = Arc::new(move || {
            let instance = Arc::new(factory());
            ResolvedInstance {
                disposable: instance.clone().as_disposable(),
                instance,
            }
        });

        tracing::debug!(key = %key, lifetime = %lifetime, "registering service factory");
        factories.insert(key, FactoryEntry { lifetime, factory: wrapped });
        Ok(())
    }

    /// Check if a type-keyed service is registered under any lifetime
    pub fn contains<T: Service>(&self) -> bool {
        self.contains_key(&ServiceKey::of::<T>())
    }

    /// Check if a named service is registered under any lifetime
    pub fn contains_named(&self, name: &str) -> bool {
        self.contains_key(&ServiceKey::named(name))
    }

    /// Check if a key is registered under any lifetime; never fails
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        let in_singletons = self
            .singletons
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false);
        in_singletons
            || self
                .factories
                .read()
                .map(|m| m.contains_key(key))
                .unwrap_or(false)
    }

    /// Resolve a type-keyed service: singleton first, else transient factory.
    ///
    /// Scoped bindings are not reachable here and report
    /// [`DiError::ServiceNotRegistered`].
    pub fn resolve<T: Service>(&self) -> Result<Arc<T>, DiError> {
        self.resolve_keyed(&ServiceKey::of::<T>())
    }

    /// Resolve a named service: singleton first, else transient factory
    pub fn resolve_named<T: Service>(&self, name: &str) -> Result<Arc<T>, DiError> {
        self.resolve_keyed(&ServiceKey::named(name))
    }

    /// Try to resolve a type-keyed service.
    ///
    /// Returns `Ok(None)` for unregistered or scoped-only keys. Errs only on
    /// a disposed registry, so lifetime bugs stay visible on the non-throwing
    /// path too.
    pub fn try_resolve<T: Service>(&self) -> Result<Option<Arc<T>>, DiError> {
        self.try_resolve_keyed(&ServiceKey::of::<T>())
    }

    /// Try to resolve a named service
    pub fn try_resolve_named<T: Service>(&self, name: &str) -> Result<Option<Arc<T>>, DiError> {
        self.try_resolve_keyed(&ServiceKey::named(name))
    }

    fn resolve_keyed<T: Service>(&self, key: &ServiceKey) -> Result<Arc<T>, DiError> {
        self.try_resolve_keyed(key)?
            .ok_or_else(|| DiError::not_registered(key.display_name()))
    }

    fn try_resolve_keyed<T: Service>(&self, key: &ServiceKey) -> Result<Option<Arc<T>>, DiError> {
        match self.lookup(key)? {
            Some(instance) => Ok(instance.downcast::<T>().ok()),
            None => Ok(None),
        }
    }

    /// Type-erased direct lookup: singleton instance or fresh transient
    /// product. Scoped factories are skipped.
    fn lookup(&self, key: &ServiceKey) -> Result<Option<Arc<dyn Any + Send + Sync>>, DiError> {
        self.ensure_live()?;

        {
            let singletons = self
                .singletons
                .read()
                .map_err(|_| DiError::lock("singleton_bindings"))?;
            if let Some(instance) = singletons.get(key) {
                return Ok(Some(instance.clone()));
            }
        }

        // Clone the factory out so it runs without the bindings lock held;
        // a factory may resolve its own dependencies through the registry.
        let factory = {
            let factories = self
                .factories
                .read()
                .map_err(|_| DiError::lock("factory_bindings"))?;
            match factories.get(key) {
                Some(entry) if entry.lifetime.is_transient() => Some(Arc::clone(&entry.factory)),
                _ => None,
            }
        };

        Ok(factory.map(|factory| factory().instance))
    }

    /// Create a new scope bound to this registry
    pub fn create_scope(self: &Arc<Self>) -> Result<ServiceScope, DiError> {
        self.ensure_live()?;
        Ok(ServiceScope::new(Arc::clone(self)))
    }

    /// Construct a scoped or transient instance on a scope's behalf.
    ///
    /// Transient and scoped factories share one key space, so the single
    /// entry for the key covers both the scoped case and the transient
    /// fallback. Returns `Ok(None)` if neither is registered.
    pub(crate) fn create_scoped_instance(
        &self,
        key: &ServiceKey,
    ) -> Result<Option<ResolvedInstance>, DiError> {
        self.ensure_live()?;
        let factory = {
            let factories = self
                .factories
                .read()
                .map_err(|_| DiError::lock("factory_bindings"))?;
            factories.get(key).map(|entry| Arc::clone(&entry.factory))
        };
        Ok(factory.map(|factory| factory()))
    }

    /// Singleton-only lookup backing a scope's fallback resolution
    pub(crate) fn singleton_instance(
        &self,
        key: &ServiceKey,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, DiError> {
        self.ensure_live()?;
        let singletons = self
            .singletons
            .read()
            .map_err(|_| DiError::lock("singleton_bindings"))?;
        Ok(singletons.get(key).cloned())
    }

    /// Mark the registry inert and drop all bindings.
    ///
    /// Idempotent. Scopes already issued by this registry are not disposed
    /// here; each scope is disposed independently by its owner, so in-flight
    /// sessions can finish cleanly after shutdown is initiated.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut singletons) = self.singletons.write() {
            singletons.clear();
        }
        if let Ok(mut factories) = self.factories.write() {
            factories.clear();
        }
        tracing::debug!("service registry disposed");
    }

    /// Check if the registry has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<(), DiError> {
        if self.is_disposed() {
            Err(DiError::disposed("ServiceRegistry"))
        } else {
            Ok(())
        }
    }

    /// Get the number of registered bindings
    pub fn service_count(&self) -> usize {
        let singletons = self.singletons.read().map(|m| m.len()).unwrap_or(0);
        let factories = self.factories.read().map(|m| m.len()).unwrap_or(0);
        singletons + factories
    }

    /// Get all registered service keys
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self
            .singletons
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if let Ok(factories) = self.factories.read() {
            keys.extend(factories.keys().cloned());
        }
        keys
    }

    /// Get the lifetime a key is registered under.
    ///
    /// A key present in both the singleton and factory mappings reports
    /// `Singleton`, matching direct resolution precedence.
    pub fn lifetime_of(&self, key: &ServiceKey) -> Option<ServiceLifetime> {
        let is_singleton = self
            .singletons
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false);
        if is_singleton {
            return Some(ServiceLifetime::Singleton);
        }
        self.factories
            .read()
            .ok()
            .and_then(|m| m.get(key).map(|entry| entry.lifetime))
    }

    /// Get binding counts per lifetime
    pub fn statistics(&self) -> RegistryStatistics {
        let mut stats = RegistryStatistics::default();

        if let Ok(singletons) = self.singletons.read() {
            stats.singleton_services = singletons.len();
        }
        if let Ok(factories) = self.factories.read() {
            for entry in factories.values() {
                match entry.lifetime {
                    ServiceLifetime::Transient => stats.transient_services += 1,
                    ServiceLifetime::Scoped => stats.scoped_services += 1,
                    ServiceLifetime::Singleton => {}
                }
            }
        }

        stats.total_services =
            stats.singleton_services + stats.transient_services + stats.scoped_services;
        stats
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn named_key(name: impl Into<String>) -> Result<ServiceKey, DiError> {
    let name = name.into();
    if name.is_empty() {
        return Err(DiError::invalid_argument("service name must not be empty"));
    }
    Ok(ServiceKey::named(name))
}

/// Binding counts for monitoring and debugging
#[derive(Debug, Default, Clone)]
pub struct RegistryStatistics {
    pub total_services: usize,
    pub singleton_services: usize,
    pub transient_services: usize,
    pub scoped_services: usize,
}
