/// Unit tests for TargetError and TargetResult
/// These pin the exact Display output and the classification predicates

use ferrous_target::{ScopeKind, TargetError, TargetResult};
use std::error::Error;
use std::io;

#[test]
fn test_error_display_not_found() {
    let error = TargetError::NotFound("userService".to_string());
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Target not found: userService");
    assert!(display_str.contains("userService"));
}

#[test]
fn test_error_display_load_failed() {
    let error = TargetError::load("prices", "catalog offline");
    assert_eq!(
        format!("{}", error),
        "Failed to load target 'prices': catalog offline"
    );
}

#[test]
fn test_error_display_scope_not_active() {
    let error = TargetError::scope_not_active(ScopeKind::Session, "no session bound");
    assert_eq!(format!("{}", error), "Scope not active: session (no session bound)");

    let custom = TargetError::scope_not_active(ScopeKind::Custom("conversation"), "ended");
    assert_eq!(format!("{}", custom), "Scope not active: conversation (ended)");
}

#[test]
fn test_error_display_configuration_variants() {
    assert_eq!(
        TargetError::invalid_configuration("missing loader").to_string(),
        "Invalid configuration: missing loader"
    );
    assert_eq!(
        TargetError::SingletonNotAccepted("catalog".to_string()).to_string(),
        "Target bean 'catalog' is a singleton; scoped proxies require a prototype"
    );
    assert_eq!(
        TargetError::HandleNotPersistent("cart".to_string()).to_string(),
        "Handle not persistent: cart"
    );
}

#[test]
fn test_error_display_type_mismatch() {
    let error = TargetError::TypeMismatch {
        name: "cart".to_string(),
        expected: "alloc::string::String",
    };
    assert_eq!(
        format!("{}", error),
        "Type mismatch for 'cart': expected alloc::string::String"
    );
}

#[test]
fn test_predicates_are_disjoint() {
    let not_active = TargetError::scope_not_active(ScopeKind::Request, "none");
    assert!(not_active.is_scope_not_active());
    assert!(!not_active.is_load_failure());
    assert!(!not_active.is_invalid_configuration());

    let load = TargetError::load("x", "boom");
    assert!(load.is_load_failure());
    assert!(!load.is_scope_not_active());
    assert!(!load.is_invalid_configuration());

    let not_found = TargetError::NotFound("x".to_string());
    assert!(not_found.is_load_failure());
    assert!(!not_found.is_scope_not_active());

    let config = TargetError::invalid_configuration("x");
    assert!(config.is_invalid_configuration());
    assert!(!config.is_load_failure());

    let singleton = TargetError::SingletonNotAccepted("x".to_string());
    assert!(singleton.is_invalid_configuration());

    let handle = TargetError::HandleNotPersistent("x".to_string());
    assert!(!handle.is_invalid_configuration());
    assert!(!handle.is_load_failure());
    assert!(!handle.is_scope_not_active());
}

#[test]
fn test_load_failed_exposes_source() {
    let io_error = io::Error::new(io::ErrorKind::ConnectionRefused, "db down");
    let error = TargetError::load("accounts", io_error);

    let source = error.source().expect("load failures carry their cause");
    assert_eq!(source.to_string(), "db down");
}

#[test]
fn test_other_variants_have_no_source() {
    assert!(TargetError::NotFound("x".to_string()).source().is_none());
    assert!(TargetError::scope_not_active(ScopeKind::Session, "x").source().is_none());
    assert!(TargetError::invalid_configuration("x").source().is_none());
}

#[test]
fn test_clone_shares_source() {
    let error = TargetError::load("prices", "catalog offline");
    let cloned = error.clone();
    assert_eq!(format!("{}", error), format!("{}", cloned));
    assert!(cloned.source().is_some());
}

#[test]
fn test_target_result_err() {
    let result: TargetResult<String> = Err(TargetError::NotFound("svc".to_string()));
    match result {
        Err(TargetError::NotFound(name)) => assert_eq!(name, "svc"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_error_debug_format() {
    let error = TargetError::scope_not_active(ScopeKind::Request, "no request bound");
    let debug_str = format!("{:?}", error);
    assert!(debug_str.contains("ScopeNotActive"));
    assert!(debug_str.contains("Request"));
    assert!(debug_str.contains("no request bound"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<E: Send + Sync + 'static>() {}
    assert_send_sync::<TargetError>();

    let boxed: Box<dyn Error + Send + Sync> = Box::new(TargetError::NotFound("x".to_string()));
    assert_eq!(boxed.to_string(), "Target not found: x");
}
