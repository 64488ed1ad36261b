//! Infrastructure adapters: HTTP transport and persistent cache backends.

pub mod cache;
#[cfg(feature = "reqwest-transport")]
pub mod http;

pub use cache::{FileCacheStore, InMemoryCacheStore};
#[cfg(feature = "reqwest-transport")]
pub use http::ReqwestTransport;
