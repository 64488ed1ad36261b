//! Tracing setup for binaries and tests embedding the client.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "fhir_batch_query=info";

/// Install an fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`]. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Same as [`init_tracing`] with a caller-chosen fallback filter, e.g.
/// `"fhir_batch_query=debug"` to see every enqueue and cut.
pub fn init_tracing_with(fallback: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
