use crate::storage::Result;

/// Defines how the master replica's parameters move given an aggregated gradient.
pub trait Optimizer {
    /// Updates `params` in place following `grad`.
    ///
    /// # Arguments
    /// * `grad` - The gradient to apply.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `grad` and `params` differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}
