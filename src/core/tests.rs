//! Tests for the core module
//!
//! Registry behaviour together with the built-in adapters and the storage
//! namespaces they hand out.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use super::*;
use crate::{
    adapters::{ConfigAdapter, StorageAdapter, CONFIG_ADAPTER_NAME},
    config::{tests::SAMPLE_CONF, AdapterSpec, Config},
    demo,
    storage::{CookieExpiry, CookieJar, NamespacedStore, SessionHandle, StorageTransport},
};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config_adapter() -> Arc<ConfigAdapter> {
    Arc::new(ConfigAdapter::new(Arc::new(Config::from_yaml(SAMPLE_CONF).unwrap())).unwrap())
}

fn registry_with(transport: StorageTransport) -> AdapterRegistry {
    init_log();
    let mut registry = AdapterRegistry::new(Arc::new(demo::catalog()), transport);
    registry
        .register_instance(CONFIG_ADAPTER_NAME, config_adapter())
        .unwrap();
    registry
}

fn registry() -> AdapterRegistry {
    registry_with(StorageTransport::default())
}

fn system_params() -> JsonValue {
    json!({"name": "system"})
}

/// Test duplicate registration keeps the first instance
#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = registry();
    let first = registry
        .register("storage", "StorageAdapter", &system_params())
        .unwrap();

    let second = registry.register("storage", "StorageAdapter", &json!({"name": "other"}));
    assert!(matches!(second, Err(CoreError::DuplicateName(name)) if name == "storage"));

    let kept = registry.get_as::<StorageAdapter>("storage").unwrap();
    assert_eq!(kept.name(), "system");
    assert!(Arc::ptr_eq(&first, &registry.get("storage").unwrap()));
}

/// Test lookups of unregistered names
#[test]
fn test_get_unregistered_is_absent() {
    let registry = registry();
    assert!(registry.get("nonexistent").is_none());
    assert!(registry.get_as::<StorageAdapter>("nonexistent").is_none());
    // registered, but not a storage adapter
    assert!(registry.get_as::<StorageAdapter>(CONFIG_ADAPTER_NAME).is_none());
}

#[test]
fn test_unknown_implementation() {
    let mut registry = registry();
    let result = registry.register("cache", "CacheAdapter", &json!({}));
    assert!(matches!(result, Err(CoreError::AdapterNotFound(name)) if name == "CacheAdapter"));
    assert!(!registry.contains("cache"));
}

#[test]
fn test_wrong_kind_is_contract_violation() {
    let mut registry = registry();
    let result = registry.register("home", "HomeController", &json!({}));
    assert!(matches!(result, Err(CoreError::ContractViolation(_))));

    let result = registry.register("echo", "apiEcho", &json!({}));
    assert!(matches!(result, Err(CoreError::ContractViolation(_))));
    assert_eq!(registry.names(), vec![CONFIG_ADAPTER_NAME]);
}

#[test]
fn test_adapter_construction_errors_propagate() {
    let mut registry = registry();
    let result = registry.register("storage", "StorageAdapter", &json!({}));
    assert!(matches!(result, Err(CoreError::ConfigurationMissing(keys)) if keys == "name"));

    // storage needs the config adapter
    let mut bare = AdapterRegistry::new(Arc::new(demo::catalog()), StorageTransport::default());
    let result = bare.register("storage", "StorageAdapter", &system_params());
    assert!(matches!(result, Err(CoreError::ConfigurationMissing(key)) if key == "config"));
}

#[test]
fn test_register_instance_is_duplicate_checked() {
    let mut registry = registry();
    let result = registry.register_instance(CONFIG_ADAPTER_NAME, config_adapter());
    assert!(matches!(result, Err(CoreError::DuplicateName(_))));
}

/// Test batch registration stops at the first failure and keeps earlier entries
#[test]
fn test_register_all_is_fail_fast() {
    let mut registry = registry();
    let specs = vec![
        AdapterSpec {
            name: "storage".to_string(),
            implementation: "StorageAdapter".to_string(),
            params: system_params(),
        },
        AdapterSpec {
            name: "broken".to_string(),
            implementation: "MissingAdapter".to_string(),
            params: json!({}),
        },
        AdapterSpec {
            name: "audit".to_string(),
            implementation: "StorageAdapter".to_string(),
            params: json!({"name": "audit"}),
        },
    ];

    let result = registry.register_all(&specs);
    assert!(matches!(result, Err(CoreError::AdapterNotFound(_))));
    assert!(registry.contains("storage"));
    assert!(!registry.contains("broken"));
    assert!(!registry.contains("audit"));
}

#[test]
fn test_create_transient() {
    let mut registry = registry();
    assert!(registry
        .create_transient("storage", &system_params())
        .unwrap()
        .is_none());

    let registered = registry
        .register("storage", "StorageAdapter", &system_params())
        .unwrap();
    let transient = registry
        .create_transient("storage", &json!({"name": "scratch"}))
        .unwrap()
        .unwrap();

    assert!(!Arc::ptr_eq(&registered, &transient));
    assert_eq!(transient.implementation(), "StorageAdapter");
    let transient = downcast_adapter::<StorageAdapter>(transient).unwrap();
    assert_eq!(transient.name(), "scratch");
    // the registered entry is untouched
    assert_eq!(registry.get_as::<StorageAdapter>("storage").unwrap().name(), "system");
}

/// Test the just-created flag across two requests sharing one session
#[test]
fn test_just_created_only_on_first_request() {
    let session = SessionHandle::default();

    let mut first = registry_with(StorageTransport::new(session.clone(), CookieJar::default()));
    first.register("storage", "StorageAdapter", &system_params()).unwrap();
    let storage = StorageAdapter::from_registry(&first, "storage").unwrap();
    assert!(storage.session().just_created());
    storage.session().set("token", json!("T1"));

    // next request, same session data
    let data = session.snapshot();
    let mut second = registry_with(StorageTransport::new(SessionHandle::new(data), CookieJar::default()));
    second.register("storage", "StorageAdapter", &system_params()).unwrap();
    let storage = StorageAdapter::from_registry(&second, "storage").unwrap();
    assert!(!storage.session().just_created());
    assert_eq!(storage.session().get("token"), Some(json!("T1")));
}

#[test]
fn test_session_namespaces_are_isolated() {
    let session = SessionHandle::default();
    let mut registry = registry_with(StorageTransport::new(session.clone(), CookieJar::default()));
    registry.register("u1", "StorageAdapter", &json!({"name": "u1"})).unwrap();
    registry.register("u2", "StorageAdapter", &json!({"name": "u2"})).unwrap();
    let u1 = StorageAdapter::from_registry(&registry, "u1").unwrap();
    let u2 = StorageAdapter::from_registry(&registry, "u2").unwrap();

    u1.session().set("a", json!("x"));
    assert_eq!(u2.session().get("a"), None);
    assert_eq!(
        session.snapshot()["core"],
        json!({"u1": {"a": "x"}, "u2": {}})
    );

    u1.session().delete("a");
    u1.session().delete("never-set");
    assert_eq!(u1.session().get("a"), None);

    u2.session().set("b", json!(1));
    assert_eq!(u2.session().values().len(), 1);
    u2.session().destroy_storage();
    assert!(u2.session().values().is_empty());
    assert_eq!(session.snapshot()["core"], json!({"u1": {}}));
}

/// Test cookie names for two owners never collide
#[test]
fn test_cookie_names_do_not_collide() {
    let jar = CookieJar::default();
    let mut registry = registry_with(StorageTransport::new(SessionHandle::default(), jar.clone()));
    registry.register("u1", "StorageAdapter", &json!({"name": "u1"})).unwrap();
    registry.register("u2", "StorageAdapter", &json!({"name": "u2"})).unwrap();
    let u1 = StorageAdapter::from_registry(&registry, "u1").unwrap();
    let u2 = StorageAdapter::from_registry(&registry, "u2").unwrap();

    u1.cookies().set("a", "x".to_string());
    u2.cookies().set("a", "x".to_string());

    let outgoing = jar.outgoing();
    assert_eq!(outgoing.len(), 2);
    assert_eq!(outgoing[0].name, "core_u1_a");
    assert_eq!(outgoing[1].name, "core_u2_a");
    assert!(outgoing
        .iter()
        .all(|c| c.http_only && c.expiry == CookieExpiry::MaxAge(604_800)));
}

#[test]
fn test_cookie_delete_expires_sent_cookie() {
    let incoming = [("core_system_skin".to_string(), "dark".to_string())].into();
    let jar = CookieJar::new(incoming);
    let mut registry = registry_with(StorageTransport::new(SessionHandle::default(), jar.clone()));
    registry.register("storage", "StorageAdapter", &system_params()).unwrap();
    let storage = StorageAdapter::from_registry(&registry, "storage").unwrap();

    assert_eq!(storage.cookies().get("skin").as_deref(), Some("dark"));
    storage.cookies().delete("template");
    assert!(jar.outgoing().is_empty());

    storage.cookies().delete("skin");
    let outgoing = jar.take_outgoing();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].value, "");
    assert_eq!(outgoing[0].expiry, CookieExpiry::Expired);
}

#[test]
fn test_storage_lookup_of_wrong_type() {
    let registry = registry();
    assert!(matches!(
        StorageAdapter::from_registry(&registry, CONFIG_ADAPTER_NAME),
        Err(CoreError::ContractViolation(_))
    ));
    assert!(matches!(
        StorageAdapter::from_registry(&registry, "storage"),
        Err(CoreError::AdapterNotFound(_))
    ));
}
