/// Tests for controller, route and parameter metadata
use lightspring::metadata::{ClassMetadata, HttpMethod, MethodMetadata, ParameterSource, RouteOptions};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
struct CreateUserDto {
    #[validate(length(min = 3))]
    name: String,
    #[validate(email)]
    email: String,
}

struct UserController;

#[test]
fn test_class_metadata_records_controller_and_routes() {
    let meta = ClassMetadata::of::<UserController>()
        .controller("/users")
        .get("/", "list")
        .post_with("/", "create", RouteOptions::new().summary("Create user").tags(["Users"]))
        .delete("/:id", "remove");

    assert_eq!(meta.class_name(), "UserController");
    assert_eq!(meta.base_path(), Some("/users"));
    assert!(meta.is_controller());

    let routes: Vec<(HttpMethod, &str, &str)> = meta.routes().iter().map(|r| (r.method(), r.path(), r.handler())).collect();
    assert_eq!(
        routes,
        vec![
            (HttpMethod::Get, "/", "list"),
            (HttpMethod::Post, "/", "create"),
            (HttpMethod::Delete, "/:id", "remove"),
        ]
    );
    assert_eq!(meta.routes()[1].options()["summary"], "Create user");
    assert_eq!(meta.routes()[1].options()["tags"], json!(["Users"]));
}

#[test]
fn test_routes_without_controller_are_kept() {
    let meta = ClassMetadata::new("Helper").get("/x", "x");
    assert!(!meta.is_controller());
    assert_eq!(meta.base_path(), None);
    assert_eq!(meta.routes().len(), 1);
}

#[test]
fn test_route_options_schema() {
    let options = RouteOptions::new()
        .body("CreateUserDto")
        .response("User")
        .schema("deprecated", json!(true))
        .to_value();

    assert_eq!(options["body"], json!({ "$ref": "CreateUserDto" }));
    assert_eq!(options["response"], json!({ "200": { "$ref": "User" } }));
    assert_eq!(options["deprecated"], true);
    assert_eq!(RouteOptions::new().to_value(), json!({}));
}

#[test]
fn test_http_method_parsing() {
    assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
    assert_eq!("DELETE".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
    assert!("PATCH".parse::<HttpMethod>().is_err());
    assert_eq!(HttpMethod::Put.to_string(), "PUT");
}

#[test]
fn test_bindings_apply_path_then_body_then_context() {
    let meta = MethodMetadata::default().ctx(2).body(1).param("id", 0);
    let sources: Vec<(usize, ParameterSource)> = meta.bindings().into_iter().map(|b| (b.index, b.source)).collect();

    assert_eq!(
        sources,
        vec![
            (0, ParameterSource::Path("id".to_string())),
            (1, ParameterSource::Body),
            (2, ParameterSource::Context),
        ]
    );
}

#[test]
fn test_method_metadata_accumulates_per_handler() {
    let meta = ClassMetadata::new("UserController")
        .controller("/users")
        .method("update", |m| m.param("id", 0))
        .method("update", |m| m.body_typed::<CreateUserDto>(1).uuid(0))
        .method("remove", |m| m.roles(["admin", "owner"]));

    let update = meta.method_metadata("update").unwrap();
    assert_eq!(update.named_params().len(), 1);
    assert_eq!(update.body_param().unwrap().index, 1);
    assert_eq!(update.body_param().unwrap().type_name, Some("CreateUserDto"));
    assert_eq!(update.uuid_params(), &[0]);

    let remove = meta.method_metadata("remove").unwrap();
    assert_eq!(remove.required_roles(), &["admin".to_string(), "owner".to_string()]);
    assert!(meta.method_metadata("missing").is_none());
}

#[test]
fn test_body_validation_runs_the_declared_checks() {
    let meta = MethodMetadata::default().body(0).validated::<CreateUserDto>(0);
    let validation = meta.body_validation().unwrap();
    assert_eq!(validation.type_name, "CreateUserDto");

    assert!((validation.check)(&json!({ "name": "alice", "email": "alice@example.com" })).is_ok());
    assert!((validation.check)(&json!({ "name": "al", "email": "alice@example.com" })).is_err());
    assert!((validation.check)(&json!({ "name": "alice", "email": "not-an-email" })).is_err());
    assert!((validation.check)(&json!({ "name": "alice" })).is_err());
}

#[test]
fn test_validation_on_a_non_body_index_is_ignored() {
    let meta = MethodMetadata::default().body(1).validated::<CreateUserDto>(0);
    assert!(meta.body_validation().is_none());

    let meta = MethodMetadata::default().validated::<CreateUserDto>(0);
    assert!(meta.body_validation().is_none());
}
