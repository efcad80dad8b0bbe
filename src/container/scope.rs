//! Request-scoped service resolution.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{downcast, Container};
use crate::constructor::AnyArc;
use crate::error::DiResult;
use crate::key::Key;

/// Resolution scope for one unit of work, typically one HTTP request.
///
/// Request-scoped services are built once per scope; singletons still come
/// from the root container and transients are always fresh.
///
/// # Examples
///
/// ```
/// use lightspring::{Constructor, Container, ServiceOptions};
/// use std::sync::Arc;
///
/// struct RequestId;
///
/// let container = Container::new();
/// container.register("RequestId", Constructor::of::<RequestId>(|_| Ok(RequestId)), ServiceOptions::request());
///
/// let scope1 = container.create_scope();
/// let scope2 = container.create_scope();
/// let a = scope1.resolve::<RequestId>("RequestId").unwrap();
/// let b = scope1.resolve::<RequestId>("RequestId").unwrap();
/// let c = scope2.resolve::<RequestId>("RequestId").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
pub struct RequestScope {
    root: Container,
    cache: Mutex<HashMap<Key, AnyArc>>,
}

impl RequestScope {
    pub(crate) fn new(root: Container) -> Self {
        Self {
            root,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn container(&self) -> &Container {
        &self.root
    }

    pub fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.root.resolve_in(key, Some(self))
    }

    pub fn resolve<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&key.into())?)
    }

    pub(crate) fn cached(&self, key: &Key) -> Option<AnyArc> {
        self.cache.lock().get(key).cloned()
    }

    pub(crate) fn store(&self, key: &Key, value: AnyArc) -> AnyArc {
        self.cache
            .lock()
            .entry(key.clone())
            .or_insert(value)
            .clone()
    }
}
