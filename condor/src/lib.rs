//! Partitions preprocessing work into cluster jobs and runs the surface
//! sampling stages over a `puzzle` scene.

mod error;
pub mod partition;
pub mod pipeline;
pub mod remote;
pub mod scheduler;
pub mod stage;
pub mod stages;
pub mod submit;
pub mod workspace;

pub use error::{CondorErr, Result};
pub use scheduler::{CondorScheduler, LocalScheduler, Scheduler};
pub use stage::{StageArgs, StageName, StageOutcome, StageRunner};
pub use workspace::Workspace;
