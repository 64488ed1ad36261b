//! Runtime adapters and the client API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::FhirClient;
pub use tokio_spawner::TokioSpawner;
