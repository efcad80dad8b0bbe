use lightspring::{Constructor, Container, ParamSpec, ServiceOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RequestId(usize);

struct Handler {
    request: Arc<RequestId>,
}

fn container_with_request_id() -> (Container, Arc<AtomicUsize>) {
    let next = Arc::new(AtomicUsize::new(0));
    let counter = next.clone();
    let container = Container::new();
    container.register(
        "RequestId",
        Constructor::of::<RequestId>(move |_| Ok(RequestId(counter.fetch_add(1, Ordering::SeqCst)))),
        ServiceOptions::request(),
    );
    (container, next)
}

#[test]
fn test_request_scoped_is_cached_per_scope() {
    let (container, _) = container_with_request_id();

    let scope1 = container.create_scope();
    let scope2 = container.create_scope();

    let a = scope1.resolve::<RequestId>("RequestId").unwrap();
    let b = scope1.resolve::<RequestId>("RequestId").unwrap();
    let c = scope2.resolve::<RequestId>("RequestId").unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(a.0, c.0);
}

#[test]
fn test_request_scoped_outside_scope_is_fresh() {
    let (container, built) = container_with_request_id();

    let a = container.resolve::<RequestId>("RequestId").unwrap();
    let b = container.resolve::<RequestId>("RequestId").unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dependencies_share_the_scope() {
    let (container, _) = container_with_request_id();
    container.register(
        "Handler",
        Constructor::of::<Handler>(|args| Ok(Handler { request: args.take(0)? }))
            .param(ParamSpec::class::<RequestId>())
            .inject(0, "RequestId"),
        ServiceOptions::default(),
    );

    let scope = container.create_scope();
    let h1 = scope.resolve::<Handler>("Handler").unwrap();
    let h2 = scope.resolve::<Handler>("Handler").unwrap();
    let direct = scope.resolve::<RequestId>("RequestId").unwrap();

    assert!(!Arc::ptr_eq(&h1, &h2));
    assert!(Arc::ptr_eq(&h1.request, &h2.request));
    assert!(Arc::ptr_eq(&h1.request, &direct));
}

#[test]
fn test_singleton_dependencies_resolve_outside_the_scope() {
    let (container, _) = container_with_request_id();
    container.register(
        "Handler",
        Constructor::of::<Handler>(|args| Ok(Handler { request: args.take(0)? }))
            .param(ParamSpec::class::<RequestId>())
            .inject(0, "RequestId"),
        ServiceOptions::singleton(),
    );

    let scope = container.create_scope();
    let handler = scope.resolve::<Handler>("Handler").unwrap();
    let scoped = scope.resolve::<RequestId>("RequestId").unwrap();

    assert!(!Arc::ptr_eq(&handler.request, &scoped));
    let again = container.create_scope().resolve::<Handler>("Handler").unwrap();
    assert!(Arc::ptr_eq(&handler, &again));
}

#[test]
fn test_singletons_are_shared_across_scopes() {
    let container = Container::new();
    container.register("Counter", Constructor::of::<AtomicUsize>(|_| Ok(AtomicUsize::new(0))), ServiceOptions::singleton());

    let a = container.create_scope().resolve::<AtomicUsize>("Counter").unwrap();
    let b = container.create_scope().resolve::<AtomicUsize>("Counter").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(container.create_scope().container().resolve::<AtomicUsize>("Counter").as_ref().unwrap(), &a));
}
