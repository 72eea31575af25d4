use std::sync::Arc;

use tokio::task;

use super::{Result, Store};

/// The async face of a `Store`.
///
/// It bridges the tokio runtime and the CPU-bound store by running every call through
/// `block_in_place`, so it must be used from a multi threaded runtime.
pub struct StoreHandle<S: Store>(Arc<S>);

impl<S: Store> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S: Store> StoreHandle<S> {
    /// Creates a new `StoreHandle` owning `store`.
    pub fn new(store: S) -> Self {
        Self(Arc::new(store))
    }

    /// The total amount of parameters held by the store.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the underlying store is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Async call to `Store::accumulate`.
    pub async fn accumulate(&self, grad: &[f32]) -> Result<()> {
        task::block_in_place(|| self.0.accumulate(grad))
    }

    /// Async call to `Store::update_params`.
    pub async fn update_params(&self) -> Result<()> {
        task::block_in_place(|| self.0.update_params())
    }

    /// Async call to `Store::pull_params`.
    pub async fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        task::block_in_place(|| self.0.pull_params(out))
    }
}
