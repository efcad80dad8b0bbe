//! The dependency injection container.
//!
//! A [`Container`] is a name-keyed registry of [`ServiceDescriptor`]s. Services
//! are registered with a [`Constructor`] that declares its parameters; on
//! resolution each class-like parameter must carry an explicit injection key,
//! which is resolved recursively. Singletons are cached on their descriptor.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::constructor::{AnyArc, Constructor, Injectable};
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::StackGuard;
use crate::key::{short_type_name, Key};
use crate::lifetime::{Lifetime, ServiceOptions};
use crate::observer::{Observers, ResolutionObserver};

pub mod scope;
pub use scope::RequestScope;

static GLOBAL: Lazy<Container> = Lazy::new(Container::new);

/// Name-keyed service registry with constructor injection.
///
/// Cloning a container is cheap and yields a handle to the same registry.
///
/// # Examples
///
/// ```
/// use lightspring::{Constructor, Container, ServiceOptions};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let container = Container::new();
/// container.register("Clock", Constructor::of::<Clock>(|_| Ok(Clock)), ServiceOptions::singleton());
///
/// let a = container.resolve::<Clock>("Clock").unwrap();
/// let b = container.resolve::<Clock>("Clock").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone, Default)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

#[derive(Default)]
struct ContainerInner {
    services: RwLock<HashMap<Key, Arc<ServiceDescriptor>>>,
    observers: RwLock<Arc<Observers>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide container.
    pub fn global() -> &'static Container {
        &GLOBAL
    }

    /// Stores a descriptor under `key`, replacing any existing registration.
    ///
    /// A replaced singleton loses its cached instance.
    pub fn register(&self, key: impl Into<Key>, constructor: Constructor, options: ServiceOptions) {
        let key = key.into();
        let lifetime = options.lifetime();
        let descriptor = Arc::new(ServiceDescriptor::new(key.clone(), constructor, options));
        let replaced = self.inner.services.write().insert(key.clone(), descriptor).is_some();
        if replaced {
            tracing::debug!(service = %key, ?lifetime, "replaced registration");
        } else {
            tracing::debug!(service = %key, ?lifetime, "registered service");
        }
    }

    /// Registers an already built value as a singleton.
    pub fn register_instance<T: Send + Sync + 'static>(&self, key: impl Into<Key>, value: T) {
        self.register_shared(key, Arc::new(value));
    }

    /// Registers a shared value as a singleton; resolution hands out this very `Arc`.
    pub fn register_shared<T: Send + Sync + 'static>(&self, key: impl Into<Key>, value: Arc<T>) {
        let constructor = Constructor::shared(short_type_name::<T>(), value);
        self.register(key, constructor, ServiceOptions::singleton());
    }

    /// Registers `T` under its constructor name and returns the key used.
    pub fn add_service<T: Injectable>(&self, options: ServiceOptions) -> Key {
        let constructor = T::constructor();
        let key = Key::named(constructor.name());
        self.register(key.clone(), constructor, options);
        key
    }

    pub fn is_registered(&self, key: &Key) -> bool {
        self.inner.services.read().contains_key(key)
    }

    pub fn descriptor(&self, key: &Key) -> Option<Arc<ServiceDescriptor>> {
        self.inner.services.read().get(key).cloned()
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.inner.services.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.services.read().is_empty()
    }

    pub fn add_observer(&self, observer: Arc<dyn ResolutionObserver>) {
        let mut guard = self.inner.observers.write();
        let mut observers = Observers::clone(&guard);
        observers.add(observer);
        *guard = Arc::new(observers);
    }

    /// Creates a scope that caches request-scoped services.
    pub fn create_scope(&self) -> RequestScope {
        RequestScope::new(self.clone())
    }

    /// Resolves the service registered under `key`.
    pub fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_in(key, None)
    }

    /// Resolves and downcasts the service registered under `key`.
    pub fn resolve<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&key.into())?)
    }

    /// Resolves an [`Injectable`] registered under its constructor name.
    pub fn resolve_type<T: Injectable>(&self) -> DiResult<Arc<T>> {
        self.resolve(Key::named(T::constructor().name()))
    }

    /// Builds an unregistered type, resolving every declared parameter by its
    /// declared type name. Explicit injection keys take precedence.
    ///
    /// This is how controllers are created: they are not services themselves,
    /// but their dependencies are.
    pub fn instantiate<T: Send + Sync + 'static>(&self, constructor: &Constructor) -> DiResult<Arc<T>> {
        let _guard = StackGuard::enter(&Key::named(constructor.name()))?;
        let mut values = Vec::with_capacity(constructor.params().len());
        for (index, param) in constructor.params().iter().enumerate() {
            let key = constructor
                .injection(index)
                .cloned()
                .unwrap_or_else(|| Key::named(param.type_name()));
            values.push(Some(self.resolve_any(&key)?));
        }
        downcast(constructor.construct(values)?)
    }

    pub(crate) fn resolve_in(&self, key: &Key, scope: Option<&RequestScope>) -> DiResult<AnyArc> {
        let observers = self.inner.observers.read().clone();
        if !observers.has_observers() {
            return self.resolve_descriptor(key, scope);
        }

        let start = Instant::now();
        observers.resolving(key);
        let result = self.resolve_descriptor(key, scope);
        match &result {
            Ok(_) => observers.resolved(key, start.elapsed()),
            Err(err) => observers.failed(key, err),
        }
        result
    }

    fn resolve_descriptor(&self, key: &Key, scope: Option<&RequestScope>) -> DiResult<AnyArc> {
        let descriptor = self
            .descriptor(key)
            .ok_or_else(|| DiError::NotFound(key.to_string()))?;

        let lifetime = descriptor.lifetime();
        match lifetime {
            Lifetime::Singleton => {
                if let Some(instance) = descriptor.cached_instance() {
                    return Ok(instance);
                }
            }
            Lifetime::Request => {
                if let Some(instance) = scope.and_then(|s| s.cached(key)) {
                    return Ok(instance);
                }
            }
            Lifetime::Transient => {}
        }

        let _guard = StackGuard::enter(key)?;
        // Singletons outlive any scope, so their dependencies resolve from the root.
        let build_scope = if lifetime == Lifetime::Singleton { None } else { scope };
        let instance = self.construct(descriptor.constructor(), build_scope)?;

        Ok(match (lifetime, scope) {
            (Lifetime::Singleton, _) => descriptor.store_instance(instance),
            (Lifetime::Request, Some(scope)) => scope.store(key, instance),
            _ => instance,
        })
    }

    fn construct(&self, constructor: &Constructor, scope: Option<&RequestScope>) -> DiResult<AnyArc> {
        let mut values = Vec::with_capacity(constructor.params().len());
        for (index, param) in constructor.params().iter().enumerate() {
            if let Some(key) = constructor.injection(index) {
                values.push(Some(self.resolve_in(key, scope)?));
            } else if param.is_class_like() {
                return Err(DiError::MissingInjection {
                    service: constructor.name().to_string(),
                    index,
                });
            } else {
                values.push(None);
            }
        }
        constructor.construct(values)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.keys())
            .finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}
