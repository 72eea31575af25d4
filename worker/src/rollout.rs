//! Action selection, rewards and the per-rollout buffer of the actor-critic trainer.
use ndarray::ArrayView1;
use puzzle::Action;
use rand::Rng;

use crate::{Result, model::Sample};

/// Reward of a transition that couldn't move at all.
pub const BLOCKED_REWARD: f32 = -0.002;
/// Reward of reaching a disentangled configuration.
pub const DISENTANGLED_REWARD: f32 = 1.;

/// Epsilon-greedy decision: with probability `epsilon` the most likely action of
/// `policy`, otherwise a uniformly random one.
pub fn decide<R: Rng + ?Sized>(policy: ArrayView1<f32>, epsilon: f32, rng: &mut R) -> Result<Action> {
    let index = if rng.random::<f32>() < epsilon {
        policy
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap_or_default()
    } else {
        rng.random_range(0..policy.len().max(1))
    };

    Ok(Action::new(index)?)
}

/// Reward of a transition given the travelled ratio and whether it disentangled.
pub fn reward(ratio: f32, disentangled: bool) -> f32 {
    if disentangled {
        DISENTANGLED_REWARD
    } else if ratio == 0. {
        BLOCKED_REWARD
    } else {
        0.
    }
}

/// One recorded step.
#[derive(Debug, Clone)]
pub struct Step {
    pub obs: Vec<f32>,
    pub action: Action,
    pub reward: f32,
    pub value: f32,
}

/// The steps of a single rollout, oldest first.
#[derive(Debug, Default, Clone)]
pub struct Rollout {
    steps: Vec<Step>,
}

impl Rollout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_reward(&self) -> f32 {
        self.steps.iter().map(|s| s.reward).sum()
    }

    /// Discounts the rewards backwards from `bootstrap`.
    ///
    /// Walking the rollout in reverse, `R = r + gamma * R` and `td = R - V`.
    ///
    /// # Returns
    /// One `(td, R)` pair per step, in rollout order.
    pub fn advantages(&self, bootstrap: f32, gamma: f32) -> Vec<(f32, f32)> {
        let mut ret = bootstrap;
        let mut out: Vec<_> = self
            .steps
            .iter()
            .rev()
            .map(|step| {
                ret = step.reward + gamma * ret;
                (ret - step.value, ret)
            })
            .collect();

        out.reverse();
        out
    }

    /// Pairs every step with its advantage, ready for the loss.
    pub fn samples<'a>(&'a self, advantages: &[(f32, f32)]) -> Vec<Sample<'a>> {
        self.steps
            .iter()
            .zip(advantages)
            .map(|(step, &(td, ret))| Sample {
                obs: &step.obs,
                action: step.action.index(),
                td,
                ret,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn step(reward: f32, value: f32) -> Step {
        Step {
            obs: vec![],
            action: Action::new(0).unwrap(),
            reward,
            value,
        }
    }

    #[test]
    fn returns_and_td_match_hand_computation() {
        let mut rollout = Rollout::new();
        rollout.push(step(0., 0.5));
        rollout.push(step(-0.002, 0.2));
        rollout.push(step(1., 0.1));

        let adv = rollout.advantages(0., 0.9);

        // R2 = 1, R1 = -0.002 + 0.9, R0 = 0 + 0.9 * 0.898
        let r2 = 1.;
        let r1 = -0.002 + 0.9 * r2;
        let r0 = 0.9 * r1;
        let expected = [(r0 - 0.5, r0), (r1 - 0.2, r1), (r2 - 0.1, r2)];

        for ((td, ret), (etd, eret)) in adv.iter().zip(expected) {
            assert!((td - etd).abs() < 1e-6);
            assert!((ret - eret).abs() < 1e-6);
        }
    }

    #[test]
    fn bootstrap_feeds_the_last_step() {
        let mut rollout = Rollout::new();
        rollout.push(step(0., 0.));

        let adv = rollout.advantages(2., 0.5);

        assert_eq!(adv, vec![(1., 1.)]);
    }

    #[test]
    fn rewards() {
        assert_eq!(reward(0., false), BLOCKED_REWARD);
        assert_eq!(reward(0.5, false), 0.);
        assert_eq!(reward(1., true), DISENTANGLED_REWARD);
        assert_eq!(reward(0., true), DISENTANGLED_REWARD);
    }

    #[test]
    fn greedy_decision_takes_argmax() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = array![0.1, 0.6, 0.3];

        for _ in 0..20 {
            let action = decide(policy.view(), 1.0, &mut rng).unwrap();
            assert_eq!(action.index(), 1);
        }
    }

    #[test]
    fn random_decision_explores() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = array![0.1, 0.6, 0.3];

        let picked: Vec<_> = (0..200)
            .map(|_| decide(policy.view(), 0.0, &mut rng).unwrap().index())
            .collect();

        assert!(picked.iter().all(|&i| i < 3));
        assert!((0..3).all(|i| picked.contains(&i)));
    }
}
