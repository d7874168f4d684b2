use std::any::TypeId;
use std::fmt;

/// Service identifier usable from both host bindings.
///
/// The statically-typed host keys services by their `TypeId`; the
/// dynamically-typed host keys them by an opaque name. Both key families flow
/// through the same registry and scope operations, so lifetime rules are
/// enforced identically for either host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// Key derived from a Rust type
    Typed {
        type_id: TypeId,
        type_name: &'static str,
    },
    /// Opaque name-based key
    Named(String),
}

impl ServiceKey {
    /// Create a key for a type
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self::Typed {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a name-based key
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Check if this key was derived from a type
    pub fn is_typed(&self) -> bool {
        matches!(self, Self::Typed { .. })
    }

    /// Check if this key is name-based
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Human-readable form of the key for diagnostics
    pub fn display_name(&self) -> &str {
        match self {
            Self::Typed { type_name, .. } => type_name,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestService;

    #[test]
    fn test_typed_key_equality() {
        let key1 = ServiceKey::of::<TestService>();
        let key2 = ServiceKey::of::<TestService>();
        let key3 = ServiceKey::of::<String>();

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_named_key_equality() {
        let key1 = ServiceKey::named("clock");
        let key2 = ServiceKey::named("clock");
        let key3 = ServiceKey::named("session");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_typed_and_named_keys_are_distinct() {
        // A name matching a type's rendered name must not collide with the
        // typed key for that type.
        let typed = ServiceKey::of::<TestService>();
        let named = ServiceKey::named(typed.display_name().to_string());

        assert!(typed.is_typed());
        assert!(named.is_named());
        assert_ne!(typed, named);
    }

    #[test]
    fn test_display_name_capture() {
        let typed = ServiceKey::of::<TestService>();
        let named = ServiceKey::named("clock");

        assert!(typed.display_name().contains("TestService"));
        assert_eq!(named.display_name(), "clock");
        assert_eq!(format!("{}", named), "clock");
    }
}
