//! Configuration models for the client, its scheduler limits, and the cache.

pub mod client;

pub use client::{CacheConfig, ClientConfig, ContentType};
