use std::{net::SocketAddr, num::NonZeroUsize};

use serde::{Deserialize, Serialize};

/// The shape of the linear actor-critic network shared by every replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Length of one observation vector.
    pub features: NonZeroUsize,
    /// Number of discrete actions of the policy head.
    pub actions: NonZeroUsize,
}

impl ModelSpec {
    /// Total amount of parameters: policy weights and bias, value weights and bias.
    pub fn num_params(&self) -> usize {
        let (f, a) = (self.features.get(), self.actions.get());
        a * f + a + f + 1
    }
}

/// Hyper-parameters of the actor-critic trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct A3cSpec {
    /// Maximum amount of steps per rollout.
    pub local_t: NonZeroUsize,
    pub gamma: f32,
    /// Entropy regularization factor.
    pub entropy_beta: f32,
    /// Probability of taking the greedy action.
    pub epsilon: f32,
    /// Bootstrap value used when a rollout ends in a terminal state.
    pub terminal_value: f32,
    pub magnitudes: [f32; 2],
    pub deltas: [f32; 2],
}

/// Hyper-parameters of the value regression trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRegressionSpec {
    pub batch: NonZeroUsize,
    /// Direction the target distance is measured along.
    pub axis: [f32; 3],
    pub origin: [f32; 3],
}

/// The specification for the `Trainer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerSpec {
    A3c(A3cSpec),
    ValueRegression(ValueRegressionSpec),
}

/// The specification for the `Scene` a worker explores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneSpec {
    BoxPuzzle {
        half_extent: f32,
        wall: f32,
        hole: f32,
        probe_range: f32,
    },
}

/// Wire-level bootstrap specification for a worker instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Worker identifier assigned by the orchestrator.
    pub worker_id: usize,
    /// Number of round trips against the parameter server.
    pub max_iterations: NonZeroUsize,
    pub server_addr: SocketAddr,
    pub model: ModelSpec,
    pub trainer: TrainerSpec,
    pub scene: SceneSpec,
    /// Optional seed for deterministic rollouts.
    pub seed: Option<u64>,
}

/// Per rollout statistics a worker sends to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutReport {
    pub worker_id: usize,
    pub iteration: usize,
    pub steps: usize,
    pub reward: f32,
    pub loss: f32,
    pub terminal: bool,
}
