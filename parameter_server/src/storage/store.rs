use super::Result;

/// The blocking interface of the master replica's parameter storage.
///
/// Every method may be called concurrently from many worker tasks.
pub trait Store {
    /// The total amount of parameters held.
    fn len(&self) -> usize;

    /// Whether the store holds no parameters at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `grad` into the currently active gradient accumulator.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `grad` doesn't have `len()` elements.
    fn accumulate(&self, grad: &[f32]) -> Result<()>;

    /// Applies the accumulated gradient through the optimizer and clears it.
    ///
    /// If another update is already running this call returns immediately.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if the optimizer state doesn't fit a shard.
    fn update_params(&self) -> Result<()>;

    /// Copies the current parameters into `out`.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `out` doesn't have `len()` elements.
    fn pull_params(&self, out: &mut [f32]) -> Result<()>;
}
