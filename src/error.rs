//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents the conditions that can occur while registering or resolving
/// services in a [`Container`](crate::Container).
///
/// # Examples
///
/// ```rust
/// use lightspring::{Container, DiError};
///
/// let container = Container::new();
/// match container.resolve_any(&"UserService".into()) {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "UserService"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No descriptor registered under the key
    #[error("Service with name {0} not found.")]
    NotFound(String),
    /// A class-like constructor parameter has no explicit injection key
    #[error("Service dependency for parameter {index} of {service} not explicitly injected. Use an explicit injection key.")]
    MissingInjection { service: String, index: usize },
    /// The constructor asked for an argument that was never resolved
    #[error("Argument {index} of {service} was not provided")]
    MissingArgument { service: String, index: usize },
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A constructor failed for a reason of its own
    #[error("Failed to construct {service}: {message}")]
    Construction { service: String, message: String },
}

impl DiError {
    /// Shorthand for constructor failures raised from build closures.
    pub fn construction(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DiError::Construction {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;
