use thiserror::Error;

use crate::container::ServiceLifetime;

/// Error type for registration and resolution failures.
#[derive(Debug, Error)]
pub enum DiError {
    #[error("duplicate registration for service '{key}': already bound as {existing}")]
    DuplicateRegistration {
        key: String,
        existing: ServiceLifetime,
    },

    #[error("service not registered: {key}")]
    ServiceNotRegistered { key: String },

    #[error("{object} has been disposed")]
    ObjectDisposed { object: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("invalid service lifetime: {lifetime}")]
    InvalidServiceLifetime { lifetime: String },
}

impl DiError {
    /// Create a new duplicate registration error
    pub fn duplicate_registration(key: impl Into<String>, existing: ServiceLifetime) -> Self {
        Self::DuplicateRegistration {
            key: key.into(),
            existing,
        }
    }

    /// Create a new service-not-registered error
    pub fn not_registered(key: impl Into<String>) -> Self {
        Self::ServiceNotRegistered { key: key.into() }
    }

    /// Create a new disposed-object error
    pub fn disposed(object: impl Into<String>) -> Self {
        Self::ObjectDisposed {
            object: object.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new lock error
    pub fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Check if the error is a duplicate registration error
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }

    /// Check if the error is a service-not-registered error
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::ServiceNotRegistered { .. })
    }

    /// Check if the error is a disposed-object error
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::ObjectDisposed { .. })
    }

    /// Check if the error is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
