use std::sync::Arc;

use crate::errors::DiError;

/// Trait for services that own releasable resources.
///
/// The scope that constructed a disposable instance releases it exactly once
/// when the scope itself is disposed.
pub trait Disposable: Send + Sync {
    /// Release the resources held by this service
    fn dispose(&self) -> Result<(), DiError>;
}

/// Trait required of every registrable service.
///
/// Types that own releasable resources opt in to scope-managed cleanup by
/// overriding [`Service::as_disposable`]:
///
/// ```
/// use std::sync::Arc;
/// use scoped_di::{Disposable, DiError, Service};
///
/// struct DbSession;
///
/// impl Disposable for DbSession {
///     fn dispose(&self) -> Result<(), DiError> {
///         // close the underlying connection
///         Ok(())
///     }
/// }
///
/// impl Service for DbSession {
///     fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
///         Some(self)
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    /// Service identifier - usually the type name
    fn service_id(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Expose this service's disposal capability, if it has one.
    ///
    /// The default returns `None`: the service holds no releasable resources
    /// and its owning scope will not track it for cleanup.
    fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>>
    where
        Self: Sized,
    {
        None
    }
}
