//! Config loading integration tests.

use athq::config::{resolve_path, RawConfig};
use athq::error::AthqError;
use athq::params::ParameterStore;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const CONFIG: &str = r#"{
    "queries": [
        {"name": "default", "value": "SELECT * FROM {table} LIMIT {limit}"},
        {"name": "by_day", "value": "SELECT * FROM {table} WHERE day = '{day}' {and}"}
    ],
    "parameters": [
        {"name": "table", "value": "events"},
        {"name": "limit", "value": "25"}
    ],
    "config": [
        {"profile": "p1", "region": "r1", "values": [{"database": "b1"}]},
        {"profile": "p1", "values": [{"database": "b2"}]},
        {"name": "database", "value": "default"},
        {"colors": ["blue"]}
    ]
}"#;

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("athena.json");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_resolve_and_lookup() {
    let dir = tempdir().unwrap();
    let path = write_config(&dir, CONFIG);

    let raw = RawConfig::load(&path).unwrap();
    let mut params = ParameterStore::new();
    params.add_from_mapping(raw.default_parameters().unwrap());
    params.add_from_delimited("day=2024-01-01").unwrap();

    let config = raw.resolve(&params).unwrap();

    assert_eq!(config.query_names(), vec!["default", "by_day"]);
    assert_eq!(
        config.lookup_query(None).unwrap().template,
        "SELECT * FROM events LIMIT 25"
    );
    assert_eq!(
        config.lookup_query(Some("by_day")).unwrap().template,
        "SELECT * FROM events WHERE day = '2024-01-01' {and}"
    );
    assert_eq!(config.colors(), vec!["blue"]);
}

#[test]
fn test_config_value_lookup_order() {
    let dir = tempdir().unwrap();
    let raw = RawConfig::load(&write_config(&dir, CONFIG)).unwrap();
    let config = raw.resolve(&ParameterStore::new()).unwrap();

    assert_eq!(config.get_config_value("database", "p1", "r1").as_deref(), Some("b1"));
    assert_eq!(config.get_config_value("database", "p1", "other").as_deref(), Some("b2"));
    assert_eq!(config.get_config_value("database", "p2", "r1").as_deref(), Some("default"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let path = resolve_path(Some(&dir.path().join("nope.json")));

    let err = RawConfig::load(&path).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert!(matches!(err, AthqError::ConfigFileNotFound(_)));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_invalid_json_names_the_file() {
    let dir = tempdir().unwrap();
    let path = write_config(&dir, "{ not json");

    let err = RawConfig::load(&path).unwrap_err();
    assert!(matches!(err, AthqError::Config(_)));
    assert!(err.to_string().contains("athena.json"));
}
