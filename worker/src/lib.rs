pub mod builder;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod rollout;
pub mod training;
pub mod worker;

pub use builder::WorkerBuilder;
pub use error::{Result, WorkerErr};
pub use worker::Worker;
