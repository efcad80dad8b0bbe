//! Controllers: route-bearing classes whose handlers are invoked by name.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::constructor::Constructor;
use crate::metadata::ClassMetadata;
use crate::web::{HandlerArgs, HttpError};

/// Result of a handler invocation; the value is serialized as the response body.
pub type HandlerResult = Result<Value, HttpError>;

/// A class exposing HTTP handlers.
///
/// `metadata` plays the role of the class and method annotations, `constructor`
/// declares the dependencies to resolve, and `invoke` dispatches a handler name
/// to the method it names.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lightspring::controller::{json, Controller, HandlerResult};
/// use lightspring::metadata::ClassMetadata;
/// use lightspring::web::{HandlerArgs, HttpError};
/// use lightspring::Constructor;
///
/// struct PingController;
///
/// #[async_trait]
/// impl Controller for PingController {
///     fn metadata() -> ClassMetadata {
///         ClassMetadata::of::<Self>().controller("/ping").get("/", "ping")
///     }
///
///     fn constructor() -> Constructor {
///         Constructor::of::<Self>(|_| Ok(PingController))
///     }
///
///     async fn invoke(&self, handler: &str, _args: HandlerArgs) -> HandlerResult {
///         match handler {
///             "ping" => json("pong"),
///             other => Err(HttpError::not_found(other.to_string())),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    fn metadata() -> ClassMetadata
    where
        Self: Sized;

    fn constructor() -> Constructor
    where
        Self: Sized;

    async fn invoke(&self, handler: &str, args: HandlerArgs) -> HandlerResult;
}

/// Serializes a handler return value.
pub fn json<T: Serialize>(value: T) -> HandlerResult {
    Ok(serde_json::to_value(value)?)
}

/// Error for a handler name the controller does not implement.
pub fn unknown_handler(controller: &str, handler: &str) -> HttpError {
    HttpError::internal(format!("{} has no handler named {}", controller, handler))
}
