/// Unit tests for ServiceDescriptor

use lightspring::{Constructor, Container, Key, Lifetime, ParamKind, ParamSpec, ServiceOptions};

struct Mailer;

#[test]
fn test_descriptor_records_registration() {
    let container = Container::new();
    container.register(
        "Mailer",
        Constructor::of::<Mailer>(|_| Ok(Mailer))
            .param(ParamSpec::primitive("String"))
            .param(ParamSpec::class_named("Transport"))
            .inject(1, "SmtpTransport"),
        ServiceOptions::request(),
    );

    let descriptor = container.descriptor(&Key::named("Mailer")).unwrap();
    assert_eq!(descriptor.key(), &Key::named("Mailer"));
    assert_eq!(descriptor.scope(), Some(Lifetime::Request));
    assert_eq!(descriptor.lifetime(), Lifetime::Request);
    assert_eq!(descriptor.constructor().name(), "Mailer");
    assert_eq!(descriptor.constructor().params()[0].kind(), ParamKind::Primitive("String"));
    assert!(descriptor.constructor().params()[1].is_class_like());
    assert_eq!(descriptor.constructor().injection(1), Some(&Key::named("SmtpTransport")));
    assert_eq!(descriptor.constructor().injection(0), None);
}

#[test]
fn test_unscoped_descriptor_is_transient() {
    let container = Container::new();
    container.register("Mailer", Constructor::of::<Mailer>(|_| Ok(Mailer)), ServiceOptions::default());

    let descriptor = container.descriptor(&Key::named("Mailer")).unwrap();
    assert_eq!(descriptor.scope(), None);
    assert_eq!(descriptor.lifetime(), Lifetime::Transient);

    container.resolve::<Mailer>("Mailer").unwrap();
    assert!(!descriptor.has_instance());
}

#[test]
fn test_keys_are_sorted() {
    let container = Container::new();
    container.register_instance("b", 1u8);
    container.register_instance("a", 2u8);
    assert_eq!(container.keys(), vec![Key::named("a"), Key::named("b")]);
}
