use lightspring::{Constructor, Container, DiError, Injectable, Key, ParamSpec, ServiceOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Config {
    port: u16,
}

#[derive(Debug)]
struct Server {
    config: Arc<Config>,
    name: String,
}

fn server_constructor() -> Constructor {
    Constructor::of::<Server>(|args| {
        Ok(Server {
            config: args.take(0)?,
            name: "MyServer".to_string(),
        })
    })
    .param(ParamSpec::class::<Config>())
}

#[test]
fn test_singleton_returns_identical_instance() {
    let container = Container::new();
    container.register("Config", Constructor::of::<Config>(|_| Ok(Config { port: 8080 })), ServiceOptions::singleton());

    let a = container.resolve::<Config>("Config").unwrap();
    let b = container.resolve::<Config>("Config").unwrap();

    assert_eq!(a.port, 8080);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(container.descriptor(&Key::named("Config")).unwrap().has_instance());
}

#[test]
fn test_unscoped_creates_new_instances() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let container = Container::new();
    container.register(
        "Config",
        Constructor::of::<Config>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Config { port: 1 })
        }),
        ServiceOptions::default(),
    );

    let a = container.resolve::<Config>("Config").unwrap();
    let b = container.resolve::<Config>("Config").unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_explicit_injection_resolves_dependency() {
    let container = Container::new();
    container.register_instance("AppConfig", Config { port: 3000 });
    container.register("Server", server_constructor().inject(0, "AppConfig"), ServiceOptions::default());

    let server = container.resolve::<Server>("Server").unwrap();
    assert_eq!(server.config.port, 3000);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_class_param_without_injection_fails() {
    let container = Container::new();
    container.register_instance("Config", Config { port: 3000 });
    container.register("Server", server_constructor(), ServiceOptions::default());

    let err = container.resolve::<Server>("Server").unwrap_err();
    match &err {
        DiError::MissingInjection { service, index } => {
            assert_eq!(service, "Server");
            assert_eq!(*index, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("not explicitly injected"));
}

#[test]
fn test_primitive_params_are_left_empty() {
    struct Greeter {
        greeting: Option<Arc<String>>,
        retries: Option<Arc<u32>>,
    }

    let container = Container::new();
    container.register(
        "Greeter",
        Constructor::of::<Greeter>(|args| {
            Ok(Greeter {
                greeting: args.take_optional(0)?,
                retries: args.take_optional(1)?,
            })
        })
        .param(ParamSpec::primitive("String"))
        .param(ParamSpec::primitive("Number")),
        ServiceOptions::default(),
    );

    let greeter = container.resolve::<Greeter>("Greeter").unwrap();
    assert!(greeter.greeting.is_none());
    assert!(greeter.retries.is_none());
}

#[test]
fn test_unknown_name_is_not_found() {
    let container = Container::new();
    let err = container.resolve::<Config>("Nope").unwrap_err();
    assert!(matches!(err, DiError::NotFound(ref name) if name == "Nope"));
}

#[test]
fn test_reregistration_replaces_descriptor_and_drops_cached_singleton() {
    let container = Container::new();
    container.register("Config", Constructor::of::<Config>(|_| Ok(Config { port: 1 })), ServiceOptions::singleton());
    let first = container.resolve::<Config>("Config").unwrap();

    container.register("Config", Constructor::of::<Config>(|_| Ok(Config { port: 2 })), ServiceOptions::singleton());
    let second = container.resolve::<Config>("Config").unwrap();

    assert_eq!(first.port, 1);
    assert_eq!(second.port, 2);
    assert_eq!(container.len(), 1);
}

#[test]
fn test_wrong_type_is_a_mismatch() {
    let container = Container::new();
    container.register_instance("Config", Config { port: 1 });
    let err = container.resolve::<Server>("Config").unwrap_err();
    assert!(matches!(err, DiError::TypeMismatch(_)));
}

#[test]
fn test_symbol_keys_are_distinct_from_names() {
    let container = Container::new();
    let token = Key::symbol("Config");
    container.register_instance(token.clone(), Config { port: 9 });

    assert_eq!(container.resolve::<Config>(&token).unwrap().port, 9);
    assert!(container.resolve::<Config>("Config").is_err());
}

#[test]
fn test_injectable_registers_under_type_name() {
    struct Repo;
    impl Injectable for Repo {
        fn constructor() -> Constructor {
            Constructor::of::<Repo>(|_| Ok(Repo))
        }
    }

    let container = Container::new();
    let key = container.add_service::<Repo>(ServiceOptions::singleton());

    assert_eq!(key, Key::named("Repo"));
    let a = container.resolve_type::<Repo>().unwrap();
    let b = container.resolve::<Repo>("Repo").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_instantiate_resolves_by_declared_type_name() {
    let container = Container::new();
    container.register_instance("Config", Config { port: 4000 });

    let server: Arc<Server> = container.instantiate(&server_constructor()).unwrap();
    assert_eq!(server.config.port, 4000);
    assert!(!container.is_registered(&Key::named("Server")));
}

#[test]
fn test_global_container_is_shared() {
    let key = Key::symbol("global-test");
    Container::global().register_instance(key.clone(), 7u8);
    assert_eq!(*Container::global().resolve::<u8>(&key).unwrap(), 7);
}
