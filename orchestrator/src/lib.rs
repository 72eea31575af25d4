pub mod configs;
pub mod error;
mod session;

pub use error::OrchestratorError;
pub use session::{Session, TrainingEvent, TrainingOutcome};

use crate::configs::{Adapter, TrainingConfig};

/// Starts the distributed training process and returns an active session.
///
/// # Errors
/// Returns an `OrchestratorError` if the config is invalid or connecting to any
/// worker or server fails.
pub async fn train(config: &TrainingConfig) -> Result<Session, OrchestratorError> {
    log::info!("adapting configs");
    let deployment = Adapter::new().adapt(config)?;
    log::info!(
        "connecting to {} worker(s) and the server at {}",
        deployment.workers.len(),
        deployment.server_addr
    );
    Session::new(deployment).await
}
