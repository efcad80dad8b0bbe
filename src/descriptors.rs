//! Service descriptors: the stored registration record for a service.

use parking_lot::Mutex;

use crate::constructor::{AnyArc, Constructor};
use crate::key::Key;
use crate::lifetime::{Lifetime, ServiceOptions};

/// Registration record held by the container.
///
/// Created by [`Container::register`](crate::Container::register) and
/// replaced wholesale by a later registration under the same key. The cached
/// instance slot is only ever filled for singletons.
#[derive(Debug)]
pub struct ServiceDescriptor {
    key: Key,
    constructor: Constructor,
    options: ServiceOptions,
    instance: Mutex<Option<AnyArc>>,
}

impl ServiceDescriptor {
    pub(crate) fn new(key: Key, constructor: Constructor, options: ServiceOptions) -> Self {
        Self {
            key,
            constructor,
            options,
            instance: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    /// The declared scope, if any.
    pub fn scope(&self) -> Option<Lifetime> {
        self.options.scope
    }

    pub fn lifetime(&self) -> Lifetime {
        self.options.lifetime()
    }

    /// Whether a singleton instance has been cached.
    pub fn has_instance(&self) -> bool {
        self.instance.lock().is_some()
    }

    pub(crate) fn cached_instance(&self) -> Option<AnyArc> {
        self.instance.lock().clone()
    }

    /// Stores `value` unless another caller got there first; returns the stored instance.
    pub(crate) fn store_instance(&self, value: AnyArc) -> AnyArc {
        let mut slot = self.instance.lock();
        match slot.as_ref() {
            Some(existing) => existing.clone(),
            None => {
                *slot = Some(value.clone());
                value
            }
        }
    }
}
