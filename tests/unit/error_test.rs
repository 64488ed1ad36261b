//! Tests for error types

use fhir_batch_query::core::QueryError;

#[test]
fn test_transport_error() {
    let err = QueryError::Transport("connection refused".to_string());
    assert_eq!(format!("{}", err), "transport error: connection refused");
}

#[test]
fn test_config_error() {
    let err = QueryError::Config("max_active_requests must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "config invalid: max_active_requests must be greater than 0"
    );
}

#[test]
fn test_cache_error() {
    let err = QueryError::Cache("disk full".to_string());
    assert_eq!(format!("{}", err), "cache error: disk full");
}

#[test]
fn test_cancelled_error() {
    assert_eq!(
        format!("{}", QueryError::Cancelled),
        "request cancelled before dispatch"
    );
}

#[test]
fn test_invalid_url_error() {
    let err = QueryError::InvalidUrl("::".to_string());
    assert_eq!(format!("{}", err), "invalid url: ::");
}

#[test]
fn test_json_error_conversion() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
    let err: QueryError = parse.unwrap_err().into();
    assert!(matches!(err, QueryError::Json(_)));
    assert!(format!("{}", err).starts_with("json error:"));
}
