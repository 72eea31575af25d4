mod adapter;
mod training;

pub use adapter::{Adapter, Deployment};
pub use training::{
    InitConfig, OptimizerConfig, ParamGenConfig, SceneConfig, SynchronizerConfig, TrainerConfig,
    TrainingConfig,
};
