//! Builders to construct clients and caches from configuration.

pub mod client_builder;

pub use client_builder::build_cache;
#[cfg(feature = "reqwest-transport")]
pub use client_builder::{build_client, build_client_from_env, build_client_with_cache, DefaultClient};
