use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification for the `Distribution` trait.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    Uniform { low: f32, high: f32 },
    UniformInclusive { low: f32, high: f32 },
    XavierUniform { fan_in: usize, fan_out: usize },
    LecunUniform { fan_in: usize },
    Normal { mean: f32, std_dev: f32 },
    Kaiming { fan_in: usize },
    Xavier { fan_in: usize, fan_out: usize },
    Lecun { fan_in: usize },
}

/// The specification for the `ParamGen` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenSpec {
    Const {
        value: f32,
        limit: usize,
    },
    Rand {
        distribution: DistributionSpec,
        limit: usize,
    },
    Chained {
        specs: Vec<ParamGenSpec>,
    },
}

impl ParamGenSpec {
    /// The amount of parameters this generator produces before running dry.
    pub fn limit(&self) -> usize {
        match self {
            Self::Const { limit, .. } | Self::Rand { limit, .. } => *limit,
            Self::Chained { specs } => specs.iter().map(Self::limit).sum(),
        }
    }
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
    RmsProp {
        learning_rate: f32,
        decay: f32,
        momentum: f32,
        epsilon: f32,
    },
}

/// The specification for the `Synchronizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronizerSpec {
    Barrier { barrier_size: usize },
    NonBlocking,
}

/// The specification for the `Server` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub workers: usize,
    pub shard_size: NonZeroUsize,
    pub param_gen: ParamGenSpec,
    pub optimizer: OptimizerSpec,
    pub synchronizer: SynchronizerSpec,
    pub seed: Option<u64>,
}
