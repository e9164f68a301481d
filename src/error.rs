//! Error types for dependency injection

use crate::ServiceKey;
use thiserror::Error;

/// Boxed error raised by user factories and constructors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while registering or resolving services
#[derive(Error, Debug)]
pub enum DiError {
    /// No descriptor is registered for the requested key
    #[error("Service not registered: {key}")]
    NotRegistered { key: ServiceKey },

    /// A key transitively depends on itself
    ///
    /// `cycle` starts and ends with the same key.
    #[error("Circular dependency detected: {}", render_cycle(.cycle))]
    CircularDependency { cycle: Vec<ServiceKey> },

    /// A factory or constructor failed while building the service
    #[error("Failed to activate service {key}: {source}")]
    Activation { key: ServiceKey, source: BoxError },

    /// Structural misuse of the registration API
    #[error("Invalid container configuration: {0}")]
    Configuration(String),
}

impl DiError {
    /// Create a NotRegistered error for a contract
    #[inline]
    pub fn not_registered<K: ?Sized + 'static>() -> Self {
        Self::NotRegistered {
            key: ServiceKey::of::<K>(),
        }
    }

    /// Create an Activation error
    #[inline]
    pub fn activation(key: ServiceKey, source: impl Into<BoxError>) -> Self {
        Self::Activation {
            key,
            source: source.into(),
        }
    }

    /// Create a Configuration error
    #[inline]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// The key this error names, if any
    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            Self::NotRegistered { key } | Self::Activation { key, .. } => Some(key),
            Self::CircularDependency { cycle } => cycle.first(),
            Self::Configuration(_) => None,
        }
    }
}

fn render_cycle(cycle: &[ServiceKey]) -> String {
    cycle
        .iter()
        .map(ServiceKey::type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    struct A;
    struct B;

    #[test]
    fn test_cycle_display() {
        let err = DiError::CircularDependency {
            cycle: vec![
                ServiceKey::of::<A>(),
                ServiceKey::of::<B>(),
                ServiceKey::of::<A>(),
            ],
        };
        let message = err.to_string();
        let a = std::any::type_name::<A>();
        let b = std::any::type_name::<B>();
        assert_eq!(
            message,
            format!("Circular dependency detected: {a} -> {b} -> {a}")
        );
    }

    #[test]
    fn test_activation_keeps_cause() {
        let err = DiError::activation(ServiceKey::of::<A>(), "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(
            err.source().map(|cause| cause.to_string()),
            Some("connection refused".to_string())
        );
        assert_eq!(err.key(), Some(&ServiceKey::of::<A>()));
    }

    #[test]
    fn test_not_registered_names_key() {
        let err = DiError::not_registered::<B>();
        assert!(err.to_string().contains(std::any::type_name::<B>()));
        assert_eq!(err.key(), Some(&ServiceKey::of::<B>()));
    }
}
