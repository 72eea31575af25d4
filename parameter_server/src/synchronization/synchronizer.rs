use crate::storage::{Result, Store, StoreHandle};

/// Coordinates how an incoming worker gradient becomes fresh master parameters.
#[allow(unused)]
#[trait_variant::make(Synchronizer: Send)]
pub trait SynchronizerTemplate: Clone {
    /// Runs one synchronization step for a single worker.
    ///
    /// # Arguments
    /// * `handle` - The master replica's store.
    /// * `grad` - The gradient pushed by the worker.
    /// * `params` - Where to write the parameters the worker must continue from.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `grad` or `params` don't match the store.
    async fn step<S>(&self, handle: &StoreHandle<S>, grad: &[f32], params: &mut [f32]) -> Result<()>
    where
        S: Store + Send + Sync;

    /// Takes a disconnecting worker out of the synchronization, steps that were
    /// waiting on it go on without it.
    async fn leave<S>(&self, handle: &StoreHandle<S>) -> Result<()>
    where
        S: Store + Send + Sync;
}
