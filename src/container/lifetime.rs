use crate::errors::DiError;

/// Service lifetime enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// Single instance shared for the registry's entire lifetime
    Singleton,
    /// New instance created on every resolution
    Transient,
    /// One instance per scope, shared across resolutions within that scope
    Scoped,
}

impl ServiceLifetime {
    /// Check if the lifetime is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, ServiceLifetime::Singleton)
    }

    /// Check if the lifetime is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceLifetime::Transient)
    }

    /// Check if the lifetime is scoped
    pub fn is_scoped(&self) -> bool {
        matches!(self, ServiceLifetime::Scoped)
    }

    /// Get the lifetime name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLifetime::Singleton => "singleton",
            ServiceLifetime::Transient => "transient",
            ServiceLifetime::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceLifetime {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(ServiceLifetime::Singleton),
            "transient" => Ok(ServiceLifetime::Transient),
            "scoped" => Ok(ServiceLifetime::Scoped),
            _ => Err(DiError::InvalidServiceLifetime {
                lifetime: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_lifetime_from_str() {
        assert_eq!(
            "singleton".parse::<ServiceLifetime>().unwrap(),
            ServiceLifetime::Singleton
        );
        assert_eq!(
            "transient".parse::<ServiceLifetime>().unwrap(),
            ServiceLifetime::Transient
        );
        assert_eq!(
            "scoped".parse::<ServiceLifetime>().unwrap(),
            ServiceLifetime::Scoped
        );

        assert!("invalid".parse::<ServiceLifetime>().is_err());
    }

    #[test]
    fn test_service_lifetime_display() {
        assert_eq!(format!("{}", ServiceLifetime::Singleton), "singleton");
        assert_eq!(format!("{}", ServiceLifetime::Transient), "transient");
        assert_eq!(format!("{}", ServiceLifetime::Scoped), "scoped");
    }
}
