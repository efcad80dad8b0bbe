//! Diagnostic observers for container resolution events.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;

/// Observer trait for dependency injection resolution events.
///
/// Observer calls are made synchronously during resolution. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use lightspring::{Container, Key, ResolutionObserver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl ResolutionObserver for Recorder {
///     fn resolving(&self, key: &Key) {
///         self.0.lock().unwrap().push(key.to_string());
///     }
///     fn resolved(&self, _key: &Key, _duration: Duration) {}
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let container = Container::new();
/// container.add_observer(recorder.clone());
/// container.register_instance("answer", 42u32);
/// container.resolve::<u32>("answer").unwrap();
/// assert_eq!(recorder.0.lock().unwrap().as_slice(), ["answer"]);
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called when resolution of a key starts.
    fn resolving(&self, key: &Key);

    /// Called when resolution of a key succeeded.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when resolution of a key failed.
    fn failed(&self, key: &Key, error: &DiError) {
        let _ = (key, error);
    }
}

/// Observer that forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(service = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::debug!(service = %key, elapsed_us = duration.as_micros() as u64, "resolved");
    }

    fn failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(service = %key, error = %error, "resolution failed");
    }
}

/// Collection of registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    pub(crate) fn failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.failed(key, error);
        }
    }
}
