//! Discovery, lookup and reporting through the registry
mod common;

use common::{Fixture, ALPHA_ID};
use plughost_plugin::{ConfigFormat, PluginError, PluginState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn test_lookup_by_name_is_case_insensitive_first_match() {
    let fixture = Fixture::new().module("a", vec![common::alpha, common::alpha]);
    let registry = fixture.registry();
    registry.load_all().unwrap();

    let first = &registry.plugins()[0];
    for query in ["A", "a"] {
        let found = registry.lookup_by_name(query).unwrap();
        assert!(Arc::ptr_eq(&found, first));
    }
    assert!(registry.lookup_by_name("missing").is_none());
}

#[test]
fn test_lookup_prefers_id_over_name() {
    let fixture = Fixture::new()
        .module("a", vec![common::alpha])
        .module("x", vec![common::alpha_id_named]);
    let registry = fixture.registry();
    registry.load_all().unwrap();

    let value = ALPHA_ID.to_string();
    let by_name = registry.lookup_by_name(&value).unwrap();
    let by_id = registry.lookup_by_id_str(&value).unwrap();
    assert_eq!(by_name.name(), value);
    assert_eq!(by_id.name(), "A");

    let resolved = registry.lookup(&value).unwrap();
    assert!(Arc::ptr_eq(&resolved, &by_id));

    // Falls back to the name when the value is not an id
    assert_eq!(registry.lookup("a").unwrap().id(), ALPHA_ID);
}

#[test]
fn test_default_id_is_nil() {
    let fixture = Fixture::new().module("d", vec![common::unnamed_id, common::unnamed_id]);
    let registry = fixture.registry();
    registry.load_all().unwrap();

    let plugins = registry.plugins();
    assert!(plugins.iter().all(|p| p.id() == Uuid::nil()));

    // Plugins without an explicit id collide on lookup; the first wins
    let found = registry.lookup_by_id(&Uuid::nil()).unwrap();
    assert!(Arc::ptr_eq(&found, &plugins[0]));
}

#[test]
fn test_unregistered_artifact_does_not_abort_pass() {
    let fixture = Fixture::new().module("a", vec![common::alpha]);
    fixture.touch("ghost");
    std::fs::write(fixture.path().join("readme.txt"), b"not a module").unwrap();
    let registry = fixture.registry();

    let report = registry.load_all().unwrap();

    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.activated, vec!["A".to_string()]);
    assert_eq!(report.artifact_failures.len(), 1);
    assert_eq!(report.artifact_failures[0].path, fixture.artifact("ghost"));
    assert!(matches!(
        report.artifact_failures[0].error,
        PluginError::ModuleNotRegistered { .. }
    ));
    assert!(!report.is_clean());
    assert_eq!(registry.stats().artifact_failures, 1);
}

#[test]
fn test_failed_constructor_skips_only_that_type() {
    let fixture = Fixture::new().module("mixed", vec![common::broken, common::alpha]);
    let registry = fixture.registry();

    let report = registry.load_all().unwrap();

    assert_eq!(report.instantiated, 1);
    assert_eq!(report.activated, vec!["A".to_string()]);
    assert!(matches!(
        report.artifact_failures[0].error,
        PluginError::InstantiationFailed { .. }
    ));
    assert_eq!(registry.stats().instantiation_failures, 1);
}

#[test]
fn test_names_unfit_for_a_data_directory_are_rejected() {
    let fixture = Fixture::new().module(
        "names",
        vec![common::blank_name, common::escaping_name, common::alpha],
    );
    let registry = fixture.registry();

    let report = registry.load_all().unwrap();

    assert_eq!(report.instantiated, 1);
    assert_eq!(report.activated, vec!["A".to_string()]);
    assert_eq!(report.artifact_failures.len(), 2);
    for failure in &report.artifact_failures {
        assert!(matches!(failure.error, PluginError::InstantiationFailed { .. }));
    }
    assert_eq!(registry.stats().instantiation_failures, 2);
    assert!(!fixture.path().parent().unwrap().join("outside").exists());
    assert!(!fixture.path().join(".json").exists());
}

#[test]
fn test_load_one() {
    let fixture = Fixture::new()
        .module("a", vec![common::alpha])
        .module("c", vec![common::gamma])
        .module("bad", vec![common::broken]);
    let registry = fixture.registry();

    let loaded = registry.load_one(fixture.artifact("a")).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].state(), PluginState::Enabled);

    // Member is kept even though activation failed
    let err = registry.load_one(fixture.artifact("c")).unwrap_err();
    assert!(err.is_dependency_not_found());
    assert_eq!(
        registry.lookup_by_name("C").unwrap().state(),
        PluginState::Instantiated
    );

    let err = registry.load_one(fixture.artifact("bad")).unwrap_err();
    assert!(matches!(err, PluginError::InstantiationFailed { .. }));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_missing_dependency_resolves_on_later_pass() {
    let fixture = Fixture::new()
        .module("a", vec![common::alpha])
        .module("b", vec![common::beta]);
    std::fs::remove_file(fixture.artifact("a")).unwrap();
    let registry = fixture.registry();

    let report = registry.load_all().unwrap();
    assert_eq!(report.failures.len(), 1);
    let b = registry.lookup_by_name("B").unwrap();
    assert_eq!(b.state(), PluginState::Instantiated);

    // The next pass appends "A" before activating, so the old "B" comes up
    fixture.touch("a");
    let report = registry.load_all().unwrap();

    assert!(report.is_clean());
    assert_eq!(
        report.activated,
        vec!["B".to_string(), "A".to_string(), "B".to_string()]
    );
    assert_eq!(b.state(), PluginState::Enabled);
    assert_eq!(common::count(&b, "loaded"), 1);
    assert_eq!(registry.stats().dependency_failures, 1);
}

#[test]
fn test_plugin_infos_serialize() {
    let fixture = Fixture::new().module("a", vec![common::alpha]);
    let registry = fixture.registry();
    registry.load_all().unwrap();

    let infos = registry.plugin_infos();
    let json = serde_json::to_value(&infos).unwrap();
    assert_eq!(json[0]["metadata"]["name"], "A");
    assert_eq!(json[0]["state"], "enabled");
    assert_eq!(json[0]["enabled"], true);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Greeting {
    text: String,
    times: u8,
}

#[test]
fn test_config_store_lives_in_data_directory() {
    let fixture = Fixture::new().module("a", vec![common::alpha]);
    let registry = fixture.registry();
    registry.load_all().unwrap();
    let a = registry.lookup_by_name("A").unwrap();

    let store = registry.config_store(&a);
    let greeting = Greeting {
        text: "hi".to_string(),
        times: 2,
    };
    let path = store.write(&greeting, ConfigFormat::Xml, None).unwrap();

    assert_eq!(path, fixture.path().join("A").join("A.xml"));
    assert_eq!(a.context().config_store(), store);
    assert_eq!(store.read::<Greeting>(ConfigFormat::Xml, None).unwrap(), greeting);
}
