use comms::specs::worker::ValueRegressionSpec;
use ndarray::{Array1, Array2, ArrayView1};
use puzzle::{Scene, State, restart};
use rand::{Rng, rngs::StdRng};

use super::{TrainStats, Trainer};
use crate::{
    Result,
    model::{ActorCritic, ops},
};

/// Regresses the value head on the distance of random valid configurations to a
/// plane, `|dot(axis, t - origin)|`.
pub struct ValueTrainer<S, R = StdRng> {
    model: ActorCritic,
    scene: S,
    spec: ValueRegressionSpec,
    rng: R,
    obs: Vec<f32>,
    xs: Array2<f32>,
    targets: Array1<f32>,
}

impl<S: Scene, R: Rng> ValueTrainer<S, R> {
    pub fn new(model: ActorCritic, scene: S, spec: ValueRegressionSpec, rng: R) -> Self {
        let obs = vec![0.; scene.observation_len()];
        let xs = Array2::zeros((spec.batch.get(), obs.len()));
        let targets = Array1::zeros(spec.batch.get());

        Self {
            model,
            scene,
            spec,
            rng,
            obs,
            xs,
            targets,
        }
    }

    /// The regression target of `state`.
    pub fn target(&self, state: &State) -> f32 {
        let [ax, ay, az] = self.spec.axis;
        let [ox, oy, oz] = self.spec.origin;
        let t = state.translation();
        (ax * (t.x - ox) + ay * (t.y - oy) + az * (t.z - oz)).abs()
    }

    fn sample_batch(&mut self) -> Result<()> {
        for i in 0..self.spec.batch.get() {
            let state = restart(&self.scene, &mut self.rng)?;
            self.targets[i] = self.target(&state);

            self.scene.observe(&state, &mut self.obs)?;
            self.xs.row_mut(i).assign(&ArrayView1::from(&self.obs[..]));
        }

        Ok(())
    }
}

impl<S, R> Trainer for ValueTrainer<S, R>
where
    S: Scene + Send,
    R: Rng + Send,
{
    fn nparams(&self) -> usize {
        self.model.nparams()
    }

    fn train(&mut self, params: &[f32], grad: &mut [f32]) -> Result<TrainStats> {
        self.sample_batch()?;

        let view = self.model.view(params)?;
        let loss = ops::value_loss_grad(&view, self.xs.view(), self.targets.view(), grad)?;

        Ok(TrainStats {
            steps: self.spec.batch.get(),
            reward: 0.,
            loss,
            terminal: false,
        })
    }
}
