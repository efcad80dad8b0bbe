//! Controller metadata: the static registration table for routes and handler parameters.
//!
//! Each controller type describes itself with a [`ClassMetadata`] value. The
//! builder methods mirror the annotations one would attach to a controller
//! class: a base path on the class, route entries per handler, and parameter
//! bindings per handler argument. Appending concerns (routes, named
//! parameters, uuid markers) accumulate; single-valued concerns (base path,
//! body, context, roles) are replaced by the last write.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::key::short_type_name;

/// HTTP methods a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// Options blob attached to a route: free-form schema entries plus optional
/// schema references for the request body and the 200 response.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    schema: Map<String, Value>,
    body: Option<String>,
    response: Option<String>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, key: impl Into<String>, value: Value) -> Self {
        self.schema.insert(key.into(), value);
        self
    }

    pub fn summary(self, summary: impl Into<String>) -> Self {
        self.schema("summary", Value::String(summary.into()))
    }

    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(|t| Value::String(t.into())).collect();
        self.schema("tags", Value::Array(tags))
    }

    /// Names the schema of the request body.
    pub fn body(mut self, schema_name: impl Into<String>) -> Self {
        self.body = Some(schema_name.into());
        self
    }

    /// Names the schema of the 200 response.
    pub fn response(mut self, schema_name: impl Into<String>) -> Self {
        self.response = Some(schema_name.into());
        self
    }

    /// Renders the blob handed to the server: schema entries, then
    /// `response: {200: {$ref}}` and `body: {$ref}` when named.
    pub fn to_value(&self) -> Value {
        let mut out = self.schema.clone();
        if let Some(response) = &self.response {
            out.insert("response".into(), json!({ "200": { "$ref": response } }));
        }
        if let Some(body) = &self.body {
            out.insert("body".into(), json!({ "$ref": body }));
        }
        Value::Object(out)
    }
}

/// One declared route of a controller.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    method: HttpMethod,
    path: String,
    handler: String,
    options: Value,
}

impl RouteDescriptor {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn options(&self) -> &Value {
        &self.options
    }
}

/// Where a handler argument comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    /// Named URL path parameter
    Path(String),
    /// Parsed request body
    Body,
    /// The reply/context object
    Context,
}

/// Parameter index mapped to its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    pub index: usize,
    pub source: ParameterSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedParam {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyParam {
    pub index: usize,
    pub type_name: Option<&'static str>,
}

/// Body check run before the handler; the error text becomes the 400 message.
pub type BodyCheck = fn(&Value) -> Result<(), String>;

/// Validation registered for the argument at `index`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedParam {
    pub index: usize,
    pub type_name: &'static str,
    pub check: BodyCheck,
}

fn check_body<T: DeserializeOwned + Validate>(value: &Value) -> Result<(), String> {
    let body = T::deserialize(value).map_err(|err| err.to_string())?;
    body.validate().map_err(|errors| errors.to_string())
}

/// Parameter metadata of one handler method.
#[derive(Debug, Clone, Default)]
pub struct MethodMetadata {
    named_params: Vec<NamedParam>,
    body: Option<BodyParam>,
    context: Option<usize>,
    uuid_params: Vec<usize>,
    validated: Option<ValidatedParam>,
    roles: Vec<String>,
}

impl MethodMetadata {
    /// Binds the argument at `index` to the path parameter `name`.
    pub fn param(mut self, name: impl Into<String>, index: usize) -> Self {
        self.named_params.push(NamedParam { name: name.into(), index });
        self
    }

    /// Binds the argument at `index` to the request body.
    pub fn body(mut self, index: usize) -> Self {
        self.body = Some(BodyParam { index, type_name: None });
        self
    }

    /// Like [`body`](Self::body), recording the declared body type.
    pub fn body_typed<T: ?Sized>(mut self, index: usize) -> Self {
        self.body = Some(BodyParam {
            index,
            type_name: Some(short_type_name::<T>()),
        });
        self
    }

    /// Binds the argument at `index` to the reply object.
    pub fn ctx(mut self, index: usize) -> Self {
        self.context = Some(index);
        self
    }

    /// Marks the argument at `index` as a UUID.
    pub fn uuid(mut self, index: usize) -> Self {
        self.uuid_params.push(index);
        self
    }

    /// Validates the argument at `index` as a `T` before the handler runs.
    ///
    /// Only takes effect when `index` is also the body parameter.
    pub fn validated<T: DeserializeOwned + Validate>(mut self, index: usize) -> Self {
        self.validated = Some(ValidatedParam {
            index,
            type_name: short_type_name::<T>(),
            check: check_body::<T>,
        });
        self
    }

    /// Restricts the handler to callers holding any of `roles`.
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn named_params(&self) -> &[NamedParam] {
        &self.named_params
    }

    pub fn body_param(&self) -> Option<BodyParam> {
        self.body
    }

    pub fn context_param(&self) -> Option<usize> {
        self.context
    }

    pub fn uuid_params(&self) -> &[usize] {
        &self.uuid_params
    }

    /// The validation to apply, if it targets the body parameter.
    pub fn body_validation(&self) -> Option<ValidatedParam> {
        match (self.body, self.validated) {
            (Some(body), Some(validated)) if body.index == validated.index => Some(validated),
            _ => None,
        }
    }

    pub fn required_roles(&self) -> &[String] {
        &self.roles
    }

    /// Merged bindings in application order: named params, then body, then context.
    pub fn bindings(&self) -> Vec<ParameterBinding> {
        let mut bindings: Vec<ParameterBinding> = self
            .named_params
            .iter()
            .map(|p| ParameterBinding {
                index: p.index,
                source: ParameterSource::Path(p.name.clone()),
            })
            .collect();
        if let Some(body) = self.body {
            bindings.push(ParameterBinding {
                index: body.index,
                source: ParameterSource::Body,
            });
        }
        if let Some(index) = self.context {
            bindings.push(ParameterBinding {
                index,
                source: ParameterSource::Context,
            });
        }
        bindings
    }
}

/// Metadata of one controller class.
///
/// # Examples
///
/// ```
/// use lightspring::metadata::{ClassMetadata, HttpMethod, ParameterSource};
///
/// let meta = ClassMetadata::new("TodoController")
///     .controller("/todos")
///     .get("/:id", "find_one")
///     .post("/", "create")
///     .method("find_one", |m| m.param("id", 0))
///     .method("create", |m| m.body(0).ctx(1));
///
/// assert_eq!(meta.base_path(), Some("/todos"));
/// assert_eq!(meta.routes()[0].method(), HttpMethod::Get);
/// let bindings = meta.method_metadata("create").unwrap().bindings();
/// assert_eq!(bindings[1].source, ParameterSource::Context);
/// ```
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    class_name: &'static str,
    base_path: Option<String>,
    routes: Vec<RouteDescriptor>,
    methods: HashMap<String, MethodMetadata>,
}

impl ClassMetadata {
    pub fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            base_path: None,
            routes: Vec::new(),
            methods: HashMap::new(),
        }
    }

    pub fn of<T: ?Sized>() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Marks the class as a controller mounted at `base_path`.
    pub fn controller(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Appends a route entry for `handler`. An empty path means `/`.
    pub fn route(
        mut self,
        method: HttpMethod,
        path: impl Into<String>,
        handler: impl Into<String>,
        options: RouteOptions,
    ) -> Self {
        let mut path = path.into();
        if path.is_empty() {
            path.push('/');
        }
        self.routes.push(RouteDescriptor {
            method,
            path,
            handler: handler.into(),
            options: options.to_value(),
        });
        self
    }

    pub fn get(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::Get, path, handler, RouteOptions::default())
    }

    pub fn post(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::Post, path, handler, RouteOptions::default())
    }

    pub fn put(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::Put, path, handler, RouteOptions::default())
    }

    pub fn delete(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::Delete, path, handler, RouteOptions::default())
    }

    pub fn get_with(self, path: impl Into<String>, handler: impl Into<String>, options: RouteOptions) -> Self {
        self.route(HttpMethod::Get, path, handler, options)
    }

    pub fn post_with(self, path: impl Into<String>, handler: impl Into<String>, options: RouteOptions) -> Self {
        self.route(HttpMethod::Post, path, handler, options)
    }

    pub fn put_with(self, path: impl Into<String>, handler: impl Into<String>, options: RouteOptions) -> Self {
        self.route(HttpMethod::Put, path, handler, options)
    }

    pub fn delete_with(self, path: impl Into<String>, handler: impl Into<String>, options: RouteOptions) -> Self {
        self.route(HttpMethod::Delete, path, handler, options)
    }

    /// Edits the parameter metadata of `handler`, creating it on first use.
    pub fn method<F>(mut self, handler: impl Into<String>, edit: F) -> Self
    where
        F: FnOnce(MethodMetadata) -> MethodMetadata,
    {
        let handler = handler.into();
        let current = self.methods.remove(&handler).unwrap_or_default();
        self.methods.insert(handler, edit(current));
        self
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn is_controller(&self) -> bool {
        self.base_path.is_some()
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn method_metadata(&self, handler: &str) -> Option<&MethodMetadata> {
        self.methods.get(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_options_render_refs() {
        let options = RouteOptions::new()
            .summary("Create todo")
            .tags(["Todo"])
            .body("CreateTodoDto")
            .response("TodoDto")
            .to_value();

        assert_eq!(options["summary"], "Create todo");
        assert_eq!(options["tags"], json!(["Todo"]));
        assert_eq!(options["body"], json!({ "$ref": "CreateTodoDto" }));
        assert_eq!(options["response"], json!({ "200": { "$ref": "TodoDto" } }));
    }

    #[test]
    fn params_append_while_body_and_context_replace() {
        let meta = ClassMetadata::new("C")
            .method("h", |m| m.param("a", 0).body(1).ctx(2))
            .method("h", |m| m.param("b", 3).body(4).ctx(5));
        let method = meta.method_metadata("h").unwrap();

        assert_eq!(method.named_params().len(), 2);
        assert_eq!(method.body_param().map(|b| b.index), Some(4));
        assert_eq!(method.context_param(), Some(5));
    }

    #[test]
    fn empty_route_path_defaults_to_root() {
        let meta = ClassMetadata::new("C").controller("/c").get("", "list");
        assert_eq!(meta.routes()[0].path(), "/");
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("delete".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }
}
