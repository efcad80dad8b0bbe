//! OpenAPI document built from the mounted routes, served under `/docs`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use crate::metadata::HttpMethod;

pub const DOCS_PATH: &str = "/docs";
pub const DOCS_JSON_PATH: &str = "/docs/json";

pub const API_TITLE: &str = "LightSpring API";
pub const API_VERSION: &str = "1.0.0";

const SWAGGER_UI: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>API documentation</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => { window.ui = SwaggerUIBundle({ url: '/docs/json', dom_id: '#swagger-ui' }); };
  </script>
</body>
</html>
"#;

/// Rewrites `/todos/:id` as `/todos/{id}`.
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(|name| json!({ "name": name, "in": "path", "required": true, "schema": { "type": "string" } }))
        .collect()
}

/// Bare schema names point into `components.schemas`.
fn schema_ref(value: &Value) -> Value {
    match value.get("$ref").and_then(Value::as_str) {
        Some(name) if !name.starts_with('#') => json!({ "$ref": format!("#/components/schemas/{}", name) }),
        _ => value.clone(),
    }
}

fn json_content(schema: &Value) -> Value {
    json!({ "application/json": { "schema": schema_ref(schema) } })
}

/// Accumulates operations and component schemas into an OpenAPI 3 document.
#[derive(Debug, Clone)]
pub struct ApiDoc {
    title: String,
    version: String,
    schemas: Map<String, Value>,
    paths: BTreeMap<String, Map<String, Value>>,
}

impl ApiDoc {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            schemas: Map::new(),
            paths: BTreeMap::new(),
        }
    }

    pub fn schema(&mut self, name: impl Into<String>, schema: Value) -> &mut Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    /// Adds one operation from a route's options blob.
    ///
    /// `response` and `body` references become `responses` and `requestBody`;
    /// every other entry is copied onto the operation as is.
    pub fn operation(&mut self, method: HttpMethod, path: &str, operation_id: &str, options: &Value) -> &mut Self {
        let mut operation = Map::new();
        operation.insert("operationId".into(), Value::String(operation_id.to_string()));
        let parameters = path_parameters(path);
        if !parameters.is_empty() {
            operation.insert("parameters".into(), Value::Array(parameters));
        }

        let mut responses = Map::new();
        if let Some(entries) = options.as_object() {
            for (key, value) in entries {
                match key.as_str() {
                    "response" => {
                        for (status, schema) in value.as_object().into_iter().flatten() {
                            responses.insert(
                                status.clone(),
                                json!({ "description": "Successful response", "content": json_content(schema) }),
                            );
                        }
                    }
                    "body" => {
                        operation.insert(
                            "requestBody".into(),
                            json!({ "required": true, "content": json_content(value) }),
                        );
                    }
                    _ => {
                        operation.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        if responses.is_empty() {
            responses.insert("200".into(), json!({ "description": "Successful response" }));
        }
        operation.insert("responses".into(), Value::Object(responses));

        self.paths
            .entry(openapi_path(path))
            .or_default()
            .insert(method.as_str().to_ascii_lowercase(), Value::Object(operation));
        self
    }

    pub fn to_value(&self) -> Value {
        json!({
            "openapi": "3.0.3",
            "info": { "title": self.title, "version": self.version },
            "components": { "schemas": self.schemas },
            "paths": self.paths,
        })
    }

    /// `/docs` serves Swagger UI, `/docs/json` the document itself.
    pub fn into_router(self) -> Router {
        let document = Arc::new(self.to_value());
        Router::new()
            .route(DOCS_PATH, get(|| async { Html(SWAGGER_UI) }))
            .route(DOCS_JSON_PATH, get(move || async move { Json(document.as_ref().clone()) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_params_become_braces() {
        assert_eq!(openapi_path("/todos/:id/comments/:cid"), "/todos/{id}/comments/{cid}");
        assert_eq!(openapi_path("/"), "/");
    }

    #[test]
    fn options_turn_into_an_operation() {
        let mut doc = ApiDoc::new("Test", "0.1.0");
        doc.schema("Todo", json!({ "type": "object" }));
        doc.operation(
            HttpMethod::Put,
            "/todos/:id",
            "TodoController.update",
            &json!({ "summary": "Update", "body": { "$ref": "Todo" }, "response": { "200": { "$ref": "Todo" } } }),
        );
        let value = doc.to_value();
        let op = &value["paths"]["/todos/{id}"]["put"];

        assert_eq!(op["summary"], "Update");
        assert_eq!(op["operationId"], "TodoController.update");
        assert_eq!(op["parameters"][0]["name"], "id");
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Todo"
        );
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Todo"
        );
        assert_eq!(value["components"]["schemas"]["Todo"]["type"], "object");
    }

    #[test]
    fn bare_routes_get_a_default_response() {
        let mut doc = ApiDoc::new("Test", "0.1.0");
        doc.operation(HttpMethod::Get, "/health", "Health.check", &json!({}));
        let value = doc.to_value();
        assert!(value["paths"]["/health"]["get"]["responses"]["200"].is_object());
        assert!(value["paths"]["/health"]["get"].get("parameters").is_none());
    }
}
