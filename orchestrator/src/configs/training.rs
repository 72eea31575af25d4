use std::{fs::File, io::BufReader, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
    GradientDescent { lr: f32 },
    GradientDescentWithMomentum { lr: f32, mu: f32 },
    RmsProp { lr: f32, decay: f32, mu: f32, eps: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronizerConfig {
    Barrier { barrier_size: usize },
    NonBlocking,
}

/// How a tensor of the model is initialized, fans are derived from the model shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenConfig {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    UniformInclusive { low: f32, high: f32 },
    XavierUniform,
    LecunUniform,
    Normal { mean: f32, std_dev: f32 },
    Kaiming,
    Xavier,
    Lecun,
}

/// Initialization of the weights of both heads, biases start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    pub policy: ParamGenConfig,
    pub value: ParamGenConfig,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            policy: ParamGenConfig::XavierUniform,
            value: ParamGenConfig::Const { value: 0. },
        }
    }
}

fn default_local_t() -> NonZeroUsize {
    NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN)
}

fn default_gamma() -> f32 {
    0.99
}

fn default_entropy_beta() -> f32 {
    0.01
}

fn default_epsilon() -> f32 {
    0.8
}

fn default_terminal_value() -> f32 {
    1.
}

fn default_magnitudes() -> [f32; 2] {
    [0.1, 0.2]
}

fn default_deltas() -> [f32; 2] {
    [0.025, 0.05]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerConfig {
    A3c {
        #[serde(default = "default_local_t")]
        local_t: NonZeroUsize,
        #[serde(default = "default_gamma")]
        gamma: f32,
        #[serde(default = "default_entropy_beta")]
        entropy_beta: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
        #[serde(default = "default_terminal_value")]
        terminal_value: f32,
        /// Translation then rotation magnitude of one action.
        #[serde(default = "default_magnitudes")]
        magnitudes: [f32; 2],
        /// Translation then rotation collision check step.
        #[serde(default = "default_deltas")]
        deltas: [f32; 2],
    },
    ValueRegression {
        batch: NonZeroUsize,
        axis: [f32; 3],
        #[serde(default)]
        origin: [f32; 3],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneConfig {
    BoxPuzzle {
        half_extent: f32,
        wall: f32,
        hole: f32,
        probe_range: f32,
    },
}

/// Everything needed to run one training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub worker_addrs: Vec<String>,
    pub server_addr: String,
    pub synchronizer: SynchronizerConfig,
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub init: InitConfig,
    pub trainer: TrainerConfig,
    pub scene: SceneConfig,
    pub max_iterations: NonZeroUsize,
    pub shard_size: NonZeroUsize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// Parses a `TrainingConfig` from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, OrchestratorError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a `TrainingConfig` from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OrchestratorError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
