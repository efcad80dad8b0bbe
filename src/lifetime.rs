//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// - **Singleton**: created once, reused for the lifetime of the container
/// - **Request**: created once per [`RequestScope`](crate::RequestScope);
///   outside a scope it is built fresh on every resolution
/// - **Transient**: created fresh on every resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    Singleton,
    Request,
    Transient,
}

/// Options attached to a registration.
///
/// The scope is optional; a registration without one behaves as transient.
///
/// # Examples
///
/// ```rust
/// use lightspring::{Lifetime, ServiceOptions};
///
/// assert_eq!(ServiceOptions::default().lifetime(), Lifetime::Transient);
/// assert_eq!(ServiceOptions::singleton().lifetime(), Lifetime::Singleton);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    pub scope: Option<Lifetime>,
}

impl ServiceOptions {
    pub fn singleton() -> Self {
        Self { scope: Some(Lifetime::Singleton) }
    }

    pub fn request() -> Self {
        Self { scope: Some(Lifetime::Request) }
    }

    pub fn transient() -> Self {
        Self { scope: Some(Lifetime::Transient) }
    }

    /// Effective lifetime: the declared scope, or transient when none was given.
    pub fn lifetime(&self) -> Lifetime {
        self.scope.unwrap_or(Lifetime::Transient)
    }
}

impl From<Lifetime> for ServiceOptions {
    fn from(lifetime: Lifetime) -> Self {
        Self { scope: Some(lifetime) }
    }
}
