//! Route table: turns controller metadata into axum routes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::{Extension, Router};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::args::{Arg, HandlerArgs};
use super::error::{HttpError, RouteError};
use super::openapi::ApiDoc;
use super::reply::{Reply, RequestInfo};
use crate::auth::{authorize, Claims};
use crate::container::Container;
use crate::controller::Controller;
use crate::metadata::{HttpMethod, ParameterBinding, ValidatedParam};

/// Joins a controller base path and a route path.
///
/// Repeated slashes collapse and a trailing slash is dropped, except for the root.
///
/// ```
/// use lightspring::web::join_paths;
///
/// assert_eq!(join_paths("/todos", "/"), "/todos");
/// assert_eq!(join_paths("/todos/", "/:id"), "/todos/:id");
/// assert_eq!(join_paths("/", "/"), "/");
/// ```
pub fn join_paths(base: &str, path: &str) -> String {
    let mut joined = String::new();
    for segment in base.split('/').chain(path.split('/')).filter(|s| !s.is_empty()) {
        joined.push('/');
        joined.push_str(segment);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

struct RouteEntry {
    controller: Arc<dyn Controller>,
    controller_name: &'static str,
    handler: String,
    bindings: Vec<ParameterBinding>,
    uuid_params: Vec<usize>,
    validation: Option<ValidatedParam>,
    roles: Vec<String>,
    options: Value,
}

struct RequestParts {
    params: HashMap<String, String>,
    user: Option<Claims>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RouteEntry {
    async fn handle(&self, container: &Container, parts: RequestParts) -> Response {
        match self.dispatch(container, parts).await {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    error!(controller = self.controller_name, handler = %self.handler, error = %err, "handler failed");
                } else {
                    debug!(controller = self.controller_name, handler = %self.handler, status = err.status().as_u16(), error = %err, "request rejected");
                }
                err.into_response()
            }
        }
    }

    async fn dispatch(&self, container: &Container, parts: RequestParts) -> Result<Response, HttpError> {
        if !self.roles.is_empty() {
            authorize(&self.roles, parts.user.as_ref())?;
        }

        let body = parse_body(&parts.body)?;
        if let Some(validation) = &self.validation {
            (validation.check)(&body).map_err(|message| {
                HttpError::bad_request(format!("Invalid {}: {}", validation.type_name, message))
            })?;
        }
        let request = RequestInfo::new(parts.method, parts.uri, parts.headers, parts.user, container.create_scope());
        let reply = Reply::new(request);
        let args = HandlerArgs::assemble(&self.bindings, &parts.params, &body, Some(&reply));

        for &index in &self.uuid_params {
            if let Some(Arg::Path(value)) = args.get(index) {
                Uuid::parse_str(value)
                    .map_err(|_| HttpError::bad_request(format!("Parameter {} must be a valid UUID", index)))?;
            }
        }

        let value = self.controller.invoke(&self.handler, args).await?;
        Ok(reply.render(value))
    }
}

fn parse_body(bytes: &Bytes) -> Result<Value, HttpError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| HttpError::bad_request(format!("Body is not valid JSON: {}", err)))
}

/// Registered routes keyed by `(path, method)`.
///
/// Controllers are instantiated once, at mount time, through the container.
pub struct RouteTable {
    container: Container,
    entries: BTreeMap<(String, HttpMethod), Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            entries: BTreeMap::new(),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Mounts every route of `C`. Returns the number of routes added.
    ///
    /// A controller without a base path is skipped.
    pub fn mount<C: Controller>(&mut self) -> Result<usize, RouteError> {
        let meta = C::metadata();
        let Some(base_path) = meta.base_path() else {
            debug!(controller = meta.class_name(), "no base path, skipping");
            return Ok(0);
        };

        let mut seen: HashMap<(String, HttpMethod), &str> = HashMap::new();
        for route in meta.routes() {
            let path = join_paths(base_path, route.path());
            let key = (path, route.method());
            let existing = match self.entries.get(&key) {
                Some(entry) => Some(format!("{}.{}", entry.controller_name, entry.handler)),
                None => seen.get(&key).map(|handler| format!("{}.{}", meta.class_name(), handler)),
            };
            if let Some(existing) = existing {
                let (path, method) = key;
                return Err(RouteError::Duplicate { method, path, existing });
            }
            seen.insert(key, route.handler());
        }

        let controller: Arc<C> = self.container.instantiate(&C::constructor())?;
        let controller: Arc<dyn Controller> = controller;
        info!(controller = meta.class_name(), base_path, "registering routes");

        for route in meta.routes() {
            let path = join_paths(base_path, route.path());
            let method_meta = meta.method_metadata(route.handler()).cloned().unwrap_or_default();
            let entry = RouteEntry {
                controller: controller.clone(),
                controller_name: meta.class_name(),
                handler: route.handler().to_string(),
                bindings: method_meta.bindings(),
                uuid_params: method_meta.uuid_params().to_vec(),
                validation: method_meta.body_validation(),
                roles: method_meta.required_roles().to_vec(),
                options: route.options().clone(),
            };
            info!(method = %route.method(), path = %path, handler = route.handler(), "route registered");
            self.entries.insert((path, route.method()), Arc::new(entry));
        }
        Ok(meta.routes().len())
    }

    /// Registered `(method, path)` pairs in path order.
    pub fn routes(&self) -> Vec<(HttpMethod, String)> {
        self.entries.keys().map(|(path, method)| (*method, path.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an operation per registered route, named `Controller.handler`.
    pub fn describe(&self, doc: &mut ApiDoc) {
        for ((path, method), entry) in &self.entries {
            let operation_id = format!("{}.{}", entry.controller_name, entry.handler);
            doc.operation(*method, path, &operation_id, &entry.options);
        }
    }

    pub fn into_router(self) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for ((path, method), entry) in self.entries {
            let container = self.container.clone();
            let handler = move |params: Option<Path<HashMap<String, String>>>,
                                user: Option<Extension<Claims>>,
                                method: Method,
                                uri: Uri,
                                headers: HeaderMap,
                                body: Bytes| {
                let entry = entry.clone();
                let container = container.clone();
                async move {
                    let parts = RequestParts {
                        params: params.map(|Path(p)| p).unwrap_or_default(),
                        user: user.map(|Extension(claims)| claims),
                        method,
                        uri,
                        headers,
                        body,
                    };
                    entry.handle(&container, parts).await
                }
            };
            let routes = by_path.remove(&path).unwrap_or_else(MethodRouter::new);
            by_path.insert(path, routes.on(method_filter(method), handler));
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, routes)| router.route(&path, routes))
    }
}
