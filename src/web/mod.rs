//! HTTP side of the framework: route table, handler arguments, reply object,
//! plus the server-wide layers and the generated API docs.

mod args;
mod dispatch;
mod error;
mod extract;
mod openapi;
mod rate_limit;
mod reply;
mod security;

pub use args::{Arg, HandlerArgs};
pub use dispatch::{join_paths, RouteTable};
pub use error::{HttpError, RouteError};
pub use extract::DiScope;
pub use openapi::{openapi_path, ApiDoc, API_TITLE, API_VERSION, DOCS_JSON_PATH, DOCS_PATH};
pub use rate_limit::{rate_limit, RateLimit};
pub use reply::{Reply, RequestInfo};
pub use security::{with_security_headers, SECURITY_HEADERS};

pub(crate) use reply::accepts_html;
