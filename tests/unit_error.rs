/// Unit tests for DiError and DiResult types

use lightspring::{DiError, DiResult};
use std::error::Error;

#[test]
fn test_error_display_not_found() {
    let error = DiError::NotFound("TestService".to_string());
    assert_eq!(error.to_string(), "Service with name TestService not found.");
}

#[test]
fn test_error_display_missing_injection() {
    let error = DiError::MissingInjection {
        service: "OrderService".to_string(),
        index: 1,
    };
    assert_eq!(
        error.to_string(),
        "Service dependency for parameter 1 of OrderService not explicitly injected. Use an explicit injection key."
    );
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch("alloc::string::String");
    assert_eq!(error.to_string(), "Type mismatch for: alloc::string::String");
}

#[test]
fn test_error_display_circular() {
    let error = DiError::Circular(vec!["ServiceA".into(), "ServiceB".into(), "ServiceA".into()]);
    assert_eq!(error.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
}

#[test]
fn test_error_display_depth_exceeded() {
    assert_eq!(DiError::DepthExceeded(256).to_string(), "Max depth 256 exceeded");
}

#[test]
fn test_construction_helper() {
    let error = DiError::construction("Mailer", "smtp host missing");
    assert_eq!(error.to_string(), "Failed to construct Mailer: smtp host missing");
    assert!(error.source().is_none());
}

#[test]
fn test_di_result_propagates() {
    fn inner() -> DiResult<u8> {
        Err(DiError::NotFound("X".to_string()))
    }
    fn outer() -> DiResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(DiError::NotFound(_))));
}

#[test]
fn test_error_is_clone() {
    let error = DiError::MissingArgument {
        service: "Svc".to_string(),
        index: 0,
    };
    let cloned = error.clone();
    assert_eq!(error.to_string(), cloned.to_string());
}
