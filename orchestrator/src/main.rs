use std::{env, io};

use futures::future;
use log::{info, warn};
use orchestrator::{TrainingEvent, configs::TrainingConfig, train};

/// Resolves on the first Ctrl-C, never if the signal can't be listened to.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupted, stopping the workers"),
        Err(e) => {
            warn!("cannot listen for Ctrl-C: {e}");
            future::pending::<()>().await
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "usage: orchestrator <config.json>",
        ));
    };

    let config = TrainingConfig::from_file(&path)?;
    let session = train(&config).await?;
    let outcome = session.wait_or_stop(interrupted()).await?;

    let rollouts = outcome
        .events
        .iter()
        .filter(|event| matches!(event, TrainingEvent::Rollout(_)))
        .count();
    info!(rollouts = rollouts, nparams = outcome.params.len(); "training finished");

    let json = serde_json::to_string(&outcome.params).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}
