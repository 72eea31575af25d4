use ndarray::{Array1, ArrayView1, ArrayView2};

use super::{layout::ParameterLayout, ops};
use crate::{Result, WorkerErr};

/// A read-only view over a flat parameter buffer.
///
/// The view *does not own* the parameters, it interprets them via `ParameterLayout`.
#[derive(Debug, Clone)]
pub struct ActorCriticView<'a> {
    layout: &'a ParameterLayout,
    policy_w: ArrayView2<'a, f32>,
    policy_b: ArrayView1<'a, f32>,
    value_w: ArrayView1<'a, f32>,
    value_b: f32,
}

impl<'a> ActorCriticView<'a> {
    pub fn new(params: &'a [f32], layout: &'a ParameterLayout) -> Result<Self> {
        if params.len() != layout.len() {
            return Err(WorkerErr::ParamsLengthMismatch {
                got: params.len(),
                expected: layout.len(),
            });
        }

        let policy_w = ArrayView2::from_shape(
            (layout.actions, layout.features),
            &params[layout.policy_w.clone()],
        )?;

        Ok(Self {
            layout,
            policy_w,
            policy_b: ArrayView1::from(&params[layout.policy_b.clone()]),
            value_w: ArrayView1::from(&params[layout.value_w.clone()]),
            value_b: params[layout.value_b.start],
        })
    }

    pub fn layout(&self) -> &ParameterLayout {
        self.layout
    }

    fn check(&self, obs: &ArrayView1<f32>) -> Result<()> {
        if obs.len() != self.layout.features {
            return Err(WorkerErr::ObservationMismatch {
                features: self.layout.features,
                observation: obs.len(),
            });
        }

        Ok(())
    }

    /// The action distribution for `obs`.
    pub fn policy(&self, obs: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check(&obs)?;
        let logits = self.policy_w.dot(&obs) + &self.policy_b;
        Ok(ops::softmax(logits))
    }

    /// The state value estimate for `obs`.
    pub fn value(&self, obs: ArrayView1<f32>) -> Result<f32> {
        self.check(&obs)?;
        Ok(self.value_w.dot(&obs) + self.value_b)
    }

    /// Evaluates both heads.
    pub fn forward(&self, obs: ArrayView1<f32>) -> Result<(Array1<f32>, f32)> {
        Ok((self.policy(obs)?, self.value(obs)?))
    }
}
