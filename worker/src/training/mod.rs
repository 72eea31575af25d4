mod a3c;
mod value;

pub use a3c::A3cTrainer;
pub use value::ValueTrainer;

use crate::Result;

/// Statistics of one training iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainStats {
    /// Environment steps (or samples) consumed.
    pub steps: usize,
    pub reward: f32,
    pub loss: f32,
    /// Whether the iteration ended an episode.
    pub terminal: bool,
}

/// Turns a parameter replica into a gradient.
pub trait Trainer: Send {
    /// Amount of parameters the trainer's model expects.
    fn nparams(&self) -> usize;

    /// Runs one training iteration against `params`.
    ///
    /// # Args
    /// * `params` - The worker's local replica.
    /// * `grad` - Output buffer of the same length, overwritten.
    ///
    /// # Returns
    /// The iteration's statistics or an error if the replica doesn't fit the model or
    /// the scene fails.
    fn train(&mut self, params: &[f32], grad: &mut [f32]) -> Result<TrainStats>;
}

impl<T: Trainer + ?Sized> Trainer for Box<T> {
    fn nparams(&self) -> usize {
        (**self).nparams()
    }

    fn train(&mut self, params: &[f32], grad: &mut [f32]) -> Result<TrainStats> {
        (**self).train(params, grad)
    }
}
