use crate::{Result, State};

/// The collision and rendering collaborator a robot moves in.
///
/// Implementations must be cheap to query, transitions probe `is_valid` many
/// times per step.
pub trait Scene {
    /// Whether the robot at `state` doesn't collide with the scene.
    fn is_valid(&self, state: &State) -> bool;

    /// Whether the robot at `state` has been separated from the scene.
    fn is_disentangled(&self, state: &State) -> bool;

    /// Length of the feature vector written by `observe`.
    fn observation_len(&self) -> usize;

    /// Writes the observation of `state` into `out`.
    ///
    /// # Returns
    /// An `ObservationSize` error if `out` isn't `observation_len()` long.
    fn observe(&self, state: &State, out: &mut [f32]) -> Result<()>;
}

impl<S: Scene + ?Sized> Scene for &S {
    fn is_valid(&self, state: &State) -> bool {
        (**self).is_valid(state)
    }

    fn is_disentangled(&self, state: &State) -> bool {
        (**self).is_disentangled(state)
    }

    fn observation_len(&self) -> usize {
        (**self).observation_len()
    }

    fn observe(&self, state: &State, out: &mut [f32]) -> Result<()> {
        (**self).observe(state, out)
    }
}
