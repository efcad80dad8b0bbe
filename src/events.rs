//! In-process application events.
//!
//! [`EventBus`] is a named-event emitter on top of a tokio broadcast channel.
//! Services bind handlers by event name; every handler runs on its own task
//! and sees the events emitted after it was bound.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constructor::Injectable;

/// Events buffered per handler before slow handlers start missing them.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// One emitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEvent {
    pub name: String,
    pub payload: Value,
}

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Runs `handler` for every later `event` emission until the bus is dropped.
    pub fn on<F, Fut>(&self, event: impl Into<String>, handler: F) -> JoinHandle<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let event = event.into();
        let mut receiver = self.sender.subscribe();
        debug!(event = %event, "event handler bound");
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(emitted) if emitted.name == event => handler(emitted.payload).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(event = %event, missed, "event handler lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Emits `event` to every bound handler. Returns how many handlers were listening on the bus.
    pub fn emit(&self, event: impl Into<String>, payload: Value) -> usize {
        let event = AppEvent {
            name: event.into(),
            payload,
        };
        debug!(event = %event.name, "event emitted");
        self.sender.send(event).unwrap_or(0)
    }

    /// Bound handlers across all event names.
    pub fn handler_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A container-managed service whose methods handle named events.
///
/// The instance is resolved from the container once at startup and asked to
/// bind its handlers.
///
/// ```
/// use std::sync::Arc;
/// use lightspring::events::{EventBus, EventSubscriber};
/// use lightspring::{Constructor, Injectable};
///
/// struct Mailer;
///
/// impl Injectable for Mailer {
///     fn constructor() -> Constructor {
///         Constructor::of::<Self>(|_| Ok(Mailer))
///     }
/// }
///
/// impl EventSubscriber for Mailer {
///     fn subscribe(self: Arc<Self>, events: &EventBus) {
///         events.on("user.created", move |payload| {
///             let mailer = self.clone();
///             async move { mailer.welcome(&payload) }
///         });
///     }
/// }
///
/// impl Mailer {
///     fn welcome(&self, _user: &serde_json::Value) {}
/// }
/// ```
pub trait EventSubscriber: Injectable {
    fn subscribe(self: Arc<Self>, events: &EventBus);
}
