use comms::specs::worker::A3cSpec;
use log::debug;
use puzzle::{Scene, State, restart, transit_state};
use rand::{Rng, rngs::StdRng};

use super::{TrainStats, Trainer};
use crate::{
    Result,
    model::ActorCritic,
    rollout::{self, Rollout, Step},
};

/// Asynchronous advantage actor-critic over a `Scene`.
///
/// The episode state lives across iterations, a rollout that doesn't reach a
/// terminal configuration is continued by the next one.
pub struct A3cTrainer<S, R = StdRng> {
    model: ActorCritic,
    scene: S,
    spec: A3cSpec,
    rng: R,
    state: State,
    obs: Vec<f32>,
    rollout: Rollout,
}

impl<S, R> A3cTrainer<S, R>
where
    S: Scene,
    R: Rng,
{
    /// Creates a trainer and starts its first episode.
    pub fn new(model: ActorCritic, scene: S, spec: A3cSpec, mut rng: R) -> Result<Self> {
        let state = restart(&scene, &mut rng)?;
        let obs = vec![0.; scene.observation_len()];

        Ok(Self {
            model,
            scene,
            spec,
            rng,
            state,
            obs,
            rollout: Rollout::new(),
        })
    }

    /// The configuration the next rollout starts from.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Collects at most `local_t` steps, stopping early at a terminal configuration.
    ///
    /// # Returns
    /// Whether the rollout ended the episode.
    fn collect(&mut self, params: &[f32]) -> Result<bool> {
        self.rollout.clear();

        for _ in 0..self.spec.local_t.get() {
            self.scene.observe(&self.state, &mut self.obs)?;
            let (policy, value) = self.model.forward(params, &self.obs)?;
            let action = rollout::decide(policy.view(), self.spec.epsilon, &mut self.rng)?;

            let transition = transit_state(
                &self.scene,
                &self.state,
                action,
                self.spec.magnitudes,
                self.spec.deltas,
            );
            let terminal = self.scene.is_disentangled(&transition.state);

            self.rollout.push(Step {
                obs: self.obs.clone(),
                action,
                reward: rollout::reward(transition.ratio, terminal),
                value,
            });
            self.state = transition.state;

            if terminal {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

impl<S, R> Trainer for A3cTrainer<S, R>
where
    S: Scene + Send,
    R: Rng + Send,
{
    fn nparams(&self) -> usize {
        self.model.nparams()
    }

    fn train(&mut self, params: &[f32], grad: &mut [f32]) -> Result<TrainStats> {
        let terminal = self.collect(params)?;

        let bootstrap = if terminal {
            self.spec.terminal_value
        } else {
            self.scene.observe(&self.state, &mut self.obs)?;
            self.model.forward(params, &self.obs)?.1
        };

        let advantages = self.rollout.advantages(bootstrap, self.spec.gamma);
        let samples = self.rollout.samples(&advantages);
        let loss = self
            .model
            .a3c_loss_grad(params, &samples, self.spec.entropy_beta, grad)?;

        let stats = TrainStats {
            steps: self.rollout.len(),
            reward: self.rollout.total_reward(),
            loss,
            terminal,
        };

        if terminal {
            debug!(steps = stats.steps; "episode disentangled, restarting");
            self.state = restart(&self.scene, &mut self.rng)?;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use comms::specs::worker::ModelSpec;
    use puzzle::{BoxPuzzle, NUM_ACTIONS};
    use rand::SeedableRng;

    use super::*;

    fn spec(local_t: usize) -> A3cSpec {
        A3cSpec {
            local_t: NonZeroUsize::new(local_t).unwrap(),
            gamma: 0.99,
            entropy_beta: 0.01,
            epsilon: 0.8,
            terminal_value: 1.,
            magnitudes: [0.1, 0.2],
            deltas: [0.025, 0.05],
        }
    }

    fn trainer(local_t: usize) -> A3cTrainer<BoxPuzzle> {
        let scene = BoxPuzzle::new(0.5, 0.1, 0.2, 2.).unwrap();
        let model = ActorCritic::new(ModelSpec {
            features: NonZeroUsize::new(scene.observation_len()).unwrap(),
            actions: NonZeroUsize::new(NUM_ACTIONS).unwrap(),
        });
        A3cTrainer::new(model, scene, spec(local_t), StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn rollout_is_bounded_by_local_t() {
        let mut trainer = trainer(5);
        let params = vec![0.; trainer.nparams()];
        let mut grad = vec![0.; trainer.nparams()];

        for _ in 0..10 {
            let stats = trainer.train(&params, &mut grad).unwrap();
            assert!(stats.steps >= 1 && stats.steps <= 5);
            assert!(stats.terminal || stats.steps == 5);
            assert!(stats.loss.is_finite());
            assert!(grad.iter().all(|g| g.is_finite()));
        }
    }

    #[test]
    fn episode_state_carries_across_rollouts() {
        let mut trainer = trainer(1);
        let params = vec![0.; trainer.nparams()];
        let mut grad = vec![0.; trainer.nparams()];

        let before = *trainer.state();
        let stats = trainer.train(&params, &mut grad).unwrap();

        if !stats.terminal {
            assert!(trainer.scene.is_valid(trainer.state()));
            let moved = *trainer.state() != before;
            assert_eq!(moved, stats.reward != rollout::BLOCKED_REWARD);
        }
    }

    #[test]
    fn wrong_replica_length_is_an_error() {
        let mut trainer = trainer(2);
        let params = vec![0.; 3];
        let mut grad = vec![0.; 3];

        assert!(trainer.train(&params, &mut grad).is_err());
    }
}
