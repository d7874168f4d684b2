use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use crate::container::key::ServiceKey;
use crate::container::registry::ServiceRegistry;
use crate::errors::DiError;
use crate::service::{Disposable, Service};

/// A bounded-lifetime resolver created by [`ServiceRegistry::create_scope`].
///
/// The scope caches scoped-factory products for its own lifetime and tracks
/// every instance it constructed that exposes a disposal capability. Disposing
/// the scope releases the tracked instances in reverse creation order; the
/// scope also disposes itself on drop, so resources are released on every
/// exit path.
///
/// A scope is intended for a single logical owner (one session, one request).
/// Construction is delegated back to the registry, keeping the scope a thin
/// cache and disposal tracker.
pub struct ServiceScope {
    scope_id: Uuid,
    registry: Arc<ServiceRegistry>,
    cache: RwLock<HashMap<ServiceKey, Arc<dyn Any + Send + Sync>>>,
    disposables: Mutex<Vec<Arc<dyn Disposable>>>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("scope_id", &self.scope_id)
            .field("cached_count", &self.cached_count())
            .field("tracked_disposables", &self.tracked_disposables())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ServiceScope {
    pub(crate) fn new(registry: Arc<ServiceRegistry>) -> Self {
        let scope_id = Uuid::new_v4();
        tracing::debug!(%scope_id, "created service scope");
        Self {
            scope_id,
            registry,
            cache: RwLock::new(HashMap::new()),
            disposables: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Get the scope ID
    pub fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    /// Resolve a type-keyed service through this scope.
    ///
    /// The first resolution of a factory-backed key constructs the instance
    /// and pins it in the scope's cache; later resolutions of the same key
    /// return the cached instance. Singletons resolve to the registry's shared
    /// instance and are not tracked by the scope.
    pub fn resolve<T: Service>(&self) -> Result<Arc<T>, DiError> {
        let key = ServiceKey::of::<T>();
        self.resolve_keyed(&key)?
            .ok_or_else(|| DiError::not_registered(key.display_name()))
    }

    /// Resolve a named service through this scope.
    ///
    /// A product that does not match the requested type is discarded and
    /// reported as not registered; nothing is cached or tracked for it.
    pub fn resolve_named<T: Service>(&self, name: &str) -> Result<Arc<T>, DiError> {
        let key = ServiceKey::named(name);
        self.resolve_keyed(&key)?
            .ok_or_else(|| DiError::not_registered(key.display_name()))
    }

    /// Try to resolve a type-keyed service.
    ///
    /// Returns `Ok(None)` for unregistered keys; errs if the scope or its
    /// registry has been disposed.
    pub fn try_resolve<T: Service>(&self) -> Result<Option<Arc<T>>, DiError> {
        self.resolve_keyed(&ServiceKey::of::<T>())
    }

    /// Try to resolve a named service
    pub fn try_resolve_named<T: Service>(&self, name: &str) -> Result<Option<Arc<T>>, DiError> {
        self.resolve_keyed(&ServiceKey::named(name))
    }

    /// Resolution core: scope cache, then factory construction via the
    /// registry, then singleton fallback.
    ///
    /// The downcast happens before anything is committed to the cache or the
    /// disposal list, so a type-mismatched resolution leaves no residue in
    /// the scope.
    fn resolve_keyed<T: Service>(&self, key: &ServiceKey) -> Result<Option<Arc<T>>, DiError> {
        if self.is_disposed() {
            return Err(DiError::disposed("ServiceScope"));
        }

        {
            let cache = self
                .cache
                .read()
                .map_err(|_| DiError::lock("scope_cache"))?;
            if let Some(cached) = cache.get(key) {
                return Ok(cached.clone().downcast::<T>().ok());
            }
        }

        if let Some(resolved) = self.registry.create_scoped_instance(key)? {
            let typed = match resolved.instance.clone().downcast::<T>() {
                Ok(typed) => typed,
                Err(_) => return Ok(None),
            };

            let mut cache = self
                .cache
                .write()
                .map_err(|_| DiError::lock("scope_cache"))?;
            cache.insert(key.clone(), resolved.instance);

            if let Some(disposable) = resolved.disposable {
                let mut disposables = self
                    .disposables
                    .lock()
                    .map_err(|_| DiError::lock("scope_disposables"))?;
                disposables.push(disposable);
            }

            return Ok(Some(typed));
        }

        // The scope did not create the singleton, so it is neither cached
        // here nor tracked for disposal.
        Ok(self
            .registry
            .singleton_instance(key)?
            .and_then(|instance| instance.downcast::<T>().ok()))
    }

    /// Release every tracked disposable and mark the scope inert.
    ///
    /// Idempotent: a second call is a silent no-op. Tracked instances are
    /// released in reverse creation order; a failing release is logged and
    /// never stops the remaining releases.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let tracked: Vec<Arc<dyn Disposable>> = match self.disposables.lock() {
            Ok(mut disposables) => disposables.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        for disposable in tracked.iter().rev() {
            if let Err(error) = disposable.dispose() {
                tracing::warn!(scope_id = %self.scope_id, %error, "error disposing scoped service");
            }
        }

        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }

        tracing::debug!(
            scope_id = %self.scope_id,
            released = tracked.len(),
            "service scope disposed"
        );
    }

    /// Check if the scope has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of instances cached in this scope
    pub fn cached_count(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Get the number of instances tracked for disposal
    pub fn tracked_disposables(&self) -> usize {
        self.disposables.lock().map(|list| list.len()).unwrap_or(0)
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Session {
        id: usize,
        disposals: Arc<AtomicUsize>,
    }

    impl Session {
        fn new(disposals: Arc<AtomicUsize>) -> Self {
            static COUNTER: AtomicUsize = AtomicUsize::new(0);
            Self {
                id: COUNTER.fetch_add(1, Ordering::SeqCst),
                disposals,
            }
        }
    }

    impl Disposable for Session {
        fn dispose(&self) -> Result<(), DiError> {
            self.disposals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Service for Session {
        fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
            Some(self)
        }
    }

    #[derive(Debug)]
    struct Clock;

    impl Service for Clock {}

    fn registry_with_scoped_session(disposals: &Arc<AtomicUsize>) -> Arc<ServiceRegistry> {
        let registry = Arc::new(ServiceRegistry::new());
        let disposals = Arc::clone(disposals);
        registry
            .register_scoped(move || Session::new(Arc::clone(&disposals)))
            .unwrap();
        registry
    }

    #[test]
    fn test_scoped_resolution_cached_per_scope() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_scoped_session(&disposals);

        let scope1 = registry.create_scope().unwrap();
        let scope2 = registry.create_scope().unwrap();

        let a = scope1.resolve::<Session>().unwrap();
        let b = scope1.resolve::<Session>().unwrap();
        let c = scope2.resolve::<Session>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(scope1.cached_count(), 1);
    }

    #[test]
    fn test_singleton_resolution_through_scope() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register_singleton(Clock).unwrap();

        let scope = registry.create_scope().unwrap();
        let from_scope = scope.resolve::<Clock>().unwrap();
        let from_registry = registry.resolve::<Clock>().unwrap();

        assert!(Arc::ptr_eq(&from_scope, &from_registry));
        // Singletons are not owned by the scope.
        assert_eq!(scope.cached_count(), 0);
        assert_eq!(scope.tracked_disposables(), 0);
    }

    #[test]
    fn test_transient_resolution_pinned_for_scope_lifetime() {
        let registry = Arc::new(ServiceRegistry::new());
        let disposals = Arc::new(AtomicUsize::new(0));
        {
            let disposals = Arc::clone(&disposals);
            registry
                .register_transient(move || Session::new(Arc::clone(&disposals)))
                .unwrap();
        }

        // Directly from the registry: a fresh instance per call.
        let direct1 = registry.resolve::<Session>().unwrap();
        let direct2 = registry.resolve::<Session>().unwrap();
        assert!(!Arc::ptr_eq(&direct1, &direct2));

        // Through a scope the product is pinned like a scoped binding.
        let scope = registry.create_scope().unwrap();
        let a = scope.resolve::<Session>().unwrap();
        let b = scope.resolve::<Session>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dispose_releases_tracked_instances_once() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_scoped_session(&disposals);

        let scope = registry.create_scope().unwrap();
        scope.resolve::<Session>().unwrap();
        assert_eq!(scope.tracked_disposables(), 1);

        scope.dispose();
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
        assert_eq!(scope.cached_count(), 0);
        assert_eq!(scope.tracked_disposables(), 0);

        // Second disposal is a silent no-op and does not double-release.
        scope.dispose();
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolution_rejected_after_dispose() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_scoped_session(&disposals);

        let scope = registry.create_scope().unwrap();
        scope.dispose();

        let error = scope.resolve::<Session>().unwrap_err();
        assert!(error.is_disposed());

        let error = scope.try_resolve::<Session>().unwrap_err();
        assert!(error.is_disposed());
    }

    #[test]
    fn test_drop_releases_tracked_instances() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_scoped_session(&disposals);

        {
            let scope = registry.create_scope().unwrap();
            scope.resolve::<Session>().unwrap();
        }

        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_releases_in_reverse_creation_order() {
        struct NamedHandle {
            name: &'static str,
            log: Arc<Mutex<Vec<&'static str>>>,
        }

        impl Disposable for NamedHandle {
            fn dispose(&self) -> Result<(), DiError> {
                self.log.lock().unwrap().push(self.name);
                Ok(())
            }
        }

        impl Service for NamedHandle {
            fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
                Some(self)
            }
        }

        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(ServiceRegistry::new());
        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            registry
                .register_scoped_named(name, move || NamedHandle {
                    name,
                    log: Arc::clone(&log),
                })
                .unwrap();
        }

        let scope = registry.create_scope().unwrap();
        scope.resolve_named::<NamedHandle>("first").unwrap();
        scope.resolve_named::<NamedHandle>("second").unwrap();
        scope.resolve_named::<NamedHandle>("third").unwrap();

        scope.dispose();

        // Later services may depend on earlier ones, so release runs LIFO.
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_type_mismatched_resolution_leaves_no_residue() {
        let registry = Arc::new(ServiceRegistry::new());
        let disposals = Arc::new(AtomicUsize::new(0));
        {
            let disposals = Arc::clone(&disposals);
            registry
                .register_scoped_named("session", move || Session::new(Arc::clone(&disposals)))
                .unwrap();
        }

        // A named key resolved at the wrong type reports absence.
        let scope = registry.create_scope().unwrap();
        let error = scope.resolve_named::<Clock>("session").unwrap_err();
        assert!(error.is_not_registered());

        // The mismatched product was discarded before being cached or
        // tracked, so it is not released later either.
        assert_eq!(scope.cached_count(), 0);
        assert_eq!(scope.tracked_disposables(), 0);
        assert_eq!(disposals.load(Ordering::SeqCst), 0);

        // The key still resolves normally at its real type.
        scope.resolve_named::<Session>("session").unwrap();
        assert_eq!(scope.tracked_disposables(), 1);

        scope.dispose();
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_release_does_not_stop_teardown() {
        struct FlakyHandle {
            fail: bool,
            releases: Arc<AtomicUsize>,
        }

        impl Disposable for FlakyHandle {
            fn dispose(&self) -> Result<(), DiError> {
                if self.fail {
                    return Err(DiError::invalid_argument("handle already released"));
                }
                self.releases.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        impl Service for FlakyHandle {
            fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
                Some(self)
            }
        }

        let releases = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(ServiceRegistry::new());
        for (name, fail) in [("first", false), ("second", true), ("third", false)] {
            let releases = Arc::clone(&releases);
            registry
                .register_scoped_named(name, move || FlakyHandle {
                    fail,
                    releases: Arc::clone(&releases),
                })
                .unwrap();
        }

        let scope = registry.create_scope().unwrap();
        scope.resolve_named::<FlakyHandle>("first").unwrap();
        scope.resolve_named::<FlakyHandle>("second").unwrap();
        scope.resolve_named::<FlakyHandle>("third").unwrap();

        scope.dispose();

        // The failing middle release did not prevent the other two.
        assert_eq!(releases.load(Ordering::SeqCst), 2);
        assert!(scope.is_disposed());
    }

    #[test]
    fn test_scope_fails_fast_once_registry_disposed() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_scoped_session(&disposals);

        let scope = registry.create_scope().unwrap();
        let cached = scope.resolve::<Session>().unwrap();

        registry.dispose();

        // Already-cached instances stay reachable, fresh construction does not.
        let again = scope.resolve::<Session>().unwrap();
        assert!(Arc::ptr_eq(&cached, &again));

        let error = scope.resolve_named::<Session>("other").unwrap_err();
        assert!(error.is_disposed());

        // The scope still owns its teardown.
        scope.dispose();
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistered_key_through_scope() {
        let registry = Arc::new(ServiceRegistry::new());
        let scope = registry.create_scope().unwrap();

        let error = scope.resolve::<Clock>().unwrap_err();
        assert!(error.is_not_registered());

        assert!(scope.try_resolve::<Clock>().unwrap().is_none());
    }
}
