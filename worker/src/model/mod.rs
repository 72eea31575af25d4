mod layout;
pub mod ops;
mod view;

use comms::specs::worker::ModelSpec;
use ndarray::{Array1, ArrayView1};

pub use layout::ParameterLayout;
pub use ops::Sample;
pub use view::ActorCriticView;

use crate::Result;

/// A linear actor-critic: a softmax policy head and a scalar value head sharing the
/// same observation.
///
/// The model holds no parameters, every call interprets the replica it is given.
#[derive(Debug, Clone)]
pub struct ActorCritic {
    layout: ParameterLayout,
}

impl ActorCritic {
    pub fn new(spec: ModelSpec) -> Self {
        Self {
            layout: ParameterLayout::new(spec),
        }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn nparams(&self) -> usize {
        self.layout.len()
    }

    pub fn view<'a>(&'a self, params: &'a [f32]) -> Result<ActorCriticView<'a>> {
        ActorCriticView::new(params, &self.layout)
    }

    /// Evaluates the policy distribution and the value of `obs` under `params`.
    pub fn forward(&self, params: &[f32], obs: &[f32]) -> Result<(Array1<f32>, f32)> {
        self.view(params)?.forward(ArrayView1::from(obs))
    }

    /// See `ops::a3c_loss_grad`.
    pub fn a3c_loss_grad(
        &self,
        params: &[f32],
        batch: &[Sample<'_>],
        entropy_beta: f32,
        grad: &mut [f32],
    ) -> Result<f32> {
        ops::a3c_loss_grad(&self.view(params)?, batch, entropy_beta, grad)
    }
}
