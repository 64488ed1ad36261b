//! Tokio runtime spawner for scheduler timers and dispatch units.

use std::future::Future;

use tokio::runtime::Handle;

use crate::core::{QueryError, Spawn};

/// Runs debounce timers and in-flight requests on a tokio runtime.
///
/// Holds a [`Handle`], so a client built inside one runtime keeps dispatching
/// there even when `get` is called from another thread.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Spawner bound to `handle`.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on.
    pub fn current() -> Result<Self, QueryError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| QueryError::Config(format!("no tokio runtime: {e}")))
    }

    /// Runtime handle tasks are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.handle.spawn(fut));
    }
}
