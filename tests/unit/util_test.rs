//! Tests for utility functions

use fhir_batch_query::util::clock::{now_ms, Clock, ManualClock, SystemClock};
use fhir_batch_query::util::telemetry::init_tracing;

#[test]
fn test_system_clock_is_after_2020() {
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
    assert!(now_ms() >= SystemClock.now_ms() - 1_000);
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(10);
    clock.advance_ms(5);
    assert_eq!(clock.now_ms(), 15);
    clock.set_ms(1_000);
    assert_eq!(clock.now_ms(), 1_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}

#[test]
fn test_init_tracing_with_custom_filter() {
    fhir_batch_query::util::telemetry::init_tracing_with("fhir_batch_query=debug");
    tracing::debug!(target: "fhir_batch_query", "debug output enabled");
}
