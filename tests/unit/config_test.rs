//! Tests for configuration validation

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use fhir_batch_query::config::{ClientConfig, ContentType};

const BASE: &str = "https://fhir.example.org/baseR4";

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = ClientConfig::new(BASE);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.max_requests_per_batch, 10);
    assert_eq!(cfg.max_active_requests, 6);
    assert_eq!(cfg.batch_timeout_ms, 20);
    assert_eq!(cfg.max_batch_wait_ms, Some(200));
    assert_eq!(cfg.content_type, ContentType::FhirJson);
}

#[test]
fn test_invalid_base_url() {
    assert!(ClientConfig::default().validate().is_err());
    assert!(ClientConfig::new("fhir.example.org").validate().is_err());
    assert!(ClientConfig::new("HTTPS://FHIR.EXAMPLE.ORG").validate().is_ok());
}

#[test]
fn test_invalid_limits() {
    assert!(ClientConfig::new(BASE)
        .with_max_requests_per_batch(0)
        .validate()
        .is_err());
    assert!(ClientConfig::new(BASE)
        .with_max_active_requests(0)
        .validate()
        .is_err());
    assert!(ClientConfig::new(BASE)
        .with_max_batch_wait_ms(Some(0))
        .validate()
        .is_err());
    assert!(ClientConfig::new(BASE)
        .with_max_batch_wait_ms(None)
        .validate()
        .is_ok());
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = ClientConfig::from_json_str(
        r#"{"service_base_url": "https://fhir.example.org/baseR4", "max_requests_per_batch": 1,
            "content_type": "json", "headers": {"Authorization": "Bearer t"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_requests_per_batch, 1);
    assert_eq!(cfg.max_active_requests, 6);
    assert_eq!(cfg.content_type.mime(), "application/json");
    assert_eq!(cfg.headers["Authorization"], "Bearer t");
}

#[test]
fn test_from_json_str_rejects_invalid() {
    let err = ClientConfig::from_json_str(r#"{"service_base_url": "x"}"#).unwrap_err();
    assert!(err.contains("service_base_url"));
    assert!(ClientConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_from_lookup() {
    let cfg = ClientConfig::from_lookup(lookup(&[
        ("FHIR_SERVICE_BASE_URL", BASE),
        ("FHIR_MAX_REQUESTS_PER_BATCH", "5"),
        ("FHIR_MAX_ACTIVE_REQUESTS", "3"),
        ("FHIR_BATCH_TIMEOUT_MS", "40"),
        ("FHIR_MAX_BATCH_WAIT_MS", "none"),
        ("FHIR_CONTENT_TYPE", "json"),
        ("FHIR_AUTHORIZATION", "Basic abc"),
        ("FHIR_CACHE_DIR", "/tmp/fhir-cache"),
    ]))
    .unwrap();

    assert_eq!(cfg.max_requests_per_batch, 5);
    assert_eq!(cfg.max_active_requests, 3);
    assert_eq!(cfg.max_batch_wait_ms, None);
    assert_eq!(cfg.content_type, ContentType::Json);
    assert_eq!(cfg.headers["Authorization"], "Basic abc");
    assert_eq!(cfg.cache.directory, Some(PathBuf::from("/tmp/fhir-cache")));

    let limits = cfg.limits();
    assert_eq!(limits.batch_timeout, Duration::from_millis(40));
    assert_eq!(limits.max_batch_wait, None);
}

#[test]
fn test_from_lookup_rejects_bad_numbers() {
    let err = ClientConfig::from_lookup(lookup(&[
        ("FHIR_SERVICE_BASE_URL", BASE),
        ("FHIR_MAX_ACTIVE_REQUESTS", "many"),
    ]))
    .unwrap_err();
    assert!(err.starts_with("FHIR_MAX_ACTIVE_REQUESTS"));
}

#[test]
fn test_from_lookup_requires_base_url() {
    assert!(ClientConfig::from_lookup(lookup(&[])).is_err());
}
