use super::Synchronizer;
use crate::storage::{Result, Store, StoreHandle};

/// Asynchronous updates, each gradient is applied as soon as it arrives and the
/// resulting parameters go straight back to the worker that pushed it.
#[derive(Clone, Default)]
pub struct NoBlockingSync;

impl NoBlockingSync {
    /// Creates a new `NoBlockingSync` synchronizer.
    pub fn new() -> Self {
        Self
    }
}

impl Synchronizer for NoBlockingSync {
    async fn step<S>(&self, handle: &StoreHandle<S>, grad: &[f32], params: &mut [f32]) -> Result<()>
    where
        S: Store + Send + Sync,
    {
        handle.accumulate(grad).await?;
        handle.update_params().await?;
        handle.pull_params(params).await
    }

    async fn leave<S>(&self, _handle: &StoreHandle<S>) -> Result<()>
    where
        S: Store + Send + Sync,
    {
        Ok(())
    }
}
