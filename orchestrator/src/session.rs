use std::{net::SocketAddr, pin::pin};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{
        server::ServerSpec,
        worker::{RolloutReport, WorkerSpec},
    },
};
use futures::future;
use log::{debug, info, warn};
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{configs::Deployment, error::OrchestratorError};

type NetRx = OnoReceiver<OwnedReadHalf>;
type NetTx = OnoSender<OwnedWriteHalf>;

/// Something that happened during training, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// A worker finished a rollout.
    Rollout(RolloutReport),
    /// A worker said goodbye.
    WorkerFinished { worker_id: usize },
}

/// The result of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// The master replica after the last update.
    pub params: Vec<f32>,
    /// Every worker's events, grouped by worker in id order.
    pub events: Vec<TrainingEvent>,
}

struct WorkerChannel {
    worker_id: usize,
    rx: NetRx,
    tx: NetTx,
}

/// Represents an ongoing training session running on remote nodes.
/// It lets its owner interact with the entire system from a single instance.
pub struct Session {
    server: (NetRx, NetTx),
    workers: Vec<WorkerChannel>,
}

impl Session {
    /// Creates a new `Session`, first the parameter server and then every worker.
    ///
    /// # Arguments
    /// * `deployment` - The addresses and specs of every node.
    ///
    /// # Returns
    /// A new `Session` instance or a `ConnectionFailed` error naming the node that
    /// couldn't be reached.
    pub async fn new(deployment: Deployment) -> Result<Self, OrchestratorError> {
        let server = Self::create_server(deployment.server_addr, deployment.server).await?;
        let workers = Self::create_workers(deployment.workers).await?;

        Ok(Self { server, workers })
    }

    /// Waits until the entire training is finished.
    ///
    /// Every worker's reports are drained concurrently until it disconnects, then the
    /// parameter server is disconnected and answers with the final parameters.
    ///
    /// # Returns
    /// The final parameters and the collected events, or an error if any node fails.
    pub async fn wait(self) -> Result<TrainingOutcome, OrchestratorError> {
        self.wait_or_stop(future::pending()).await
    }

    /// Like `wait`, but once `stop` resolves every worker is asked to stop after its
    /// current round trip. The session still ends normally with the parameters
    /// reached so far.
    pub async fn wait_or_stop<F>(self, stop: F) -> Result<TrainingOutcome, OrchestratorError>
    where
        F: Future<Output = ()>,
    {
        let Self { server, workers } = self;
        let mut stoppers = Vec::with_capacity(workers.len());
        let mut drains = Vec::with_capacity(workers.len());

        for WorkerChannel { worker_id, rx, tx } in workers {
            stoppers.push((worker_id, tx));
            drains.push(Self::drain_worker(worker_id, rx));
        }

        let mut drains = pin!(future::try_join_all(drains));
        let mut stop = pin!(stop);

        let per_worker = tokio::select! {
            drained = &mut drains => drained?,
            () = &mut stop => {
                Self::stop_workers(&mut stoppers).await;
                drains.await?
            }
        };
        let events: Vec<_> = per_worker.into_iter().flatten().collect();

        let (mut rx, mut tx) = server;
        tx.send(&Msg::Control(Command::Disconnect)).await?;

        let mut rx_buf: Vec<f32> = Vec::new();
        loop {
            match rx.recv_into(&mut rx_buf).await? {
                Msg::Data(Payload::Params(params)) => {
                    info!(nparams = params.len(); "received final parameters");
                    return Ok(TrainingOutcome {
                        params: params.to_vec(),
                        events,
                    });
                }
                Msg::Err(detail) => return Err(OrchestratorError::ServerError(detail.into_owned())),
                other => warn!("ignoring {} from the parameter server", other.kind()),
            }
        }
    }

    /// Sends `Disconnect` to every worker, a worker that already left is skipped.
    async fn stop_workers(stoppers: &mut [(usize, NetTx)]) {
        info!(workers = stoppers.len(); "stopping the training");
        let msg = Msg::Control(Command::Disconnect);

        for (worker_id, tx) in stoppers {
            if let Err(e) = tx.send(&msg).await {
                debug!(worker_id = *worker_id; "worker already gone: {e}");
            }
        }
    }

    /// Collects a worker's reports until its `Disconnect`.
    async fn drain_worker(
        worker_id: usize,
        mut rx: NetRx,
    ) -> Result<Vec<TrainingEvent>, OrchestratorError> {
        let mut rx_buf: Vec<u32> = Vec::new();
        let mut events = Vec::new();

        loop {
            match rx.recv_into(&mut rx_buf).await? {
                Msg::Control(Command::ReportRollout(report)) => {
                    debug!(
                        worker_id = report.worker_id,
                        iteration = report.iteration,
                        loss = report.loss,
                        reward = report.reward;
                        "rollout"
                    );
                    events.push(TrainingEvent::Rollout(report));
                }
                Msg::Control(Command::Disconnect) => {
                    info!(worker_id = worker_id; "worker finished");
                    events.push(TrainingEvent::WorkerFinished { worker_id });
                    return Ok(events);
                }
                Msg::Err(detail) => {
                    return Err(OrchestratorError::WorkerError {
                        worker_id,
                        msg: detail.into_owned(),
                    });
                }
                other => {
                    warn!(worker_id = worker_id; "ignoring {} from worker", other.kind());
                }
            }
        }
    }

    /// Tries to reach the parameter server and create it using the given specification.
    async fn create_server(
        server_addr: SocketAddr,
        server_spec: ServerSpec,
    ) -> Result<(NetRx, NetTx), OrchestratorError> {
        let (rx, mut tx) = Self::open_channel(server_addr).await?;
        let msg = Msg::Control(Command::CreateServer(server_spec));
        tx.send(&msg).await?;
        info!("created parameter server at {server_addr}");
        Ok((rx, tx))
    }

    /// Tries to reach the workers and create them using their specifications.
    async fn create_workers(
        workers: Vec<(SocketAddr, WorkerSpec)>,
    ) -> Result<Vec<WorkerChannel>, OrchestratorError> {
        let mut channels = Vec::with_capacity(workers.len());

        for (addr, spec) in workers {
            let worker_id = spec.worker_id;
            let (rx, mut tx) = Self::open_channel(addr).await?;
            tx.send(&Msg::Control(Command::CreateWorker(spec))).await?;
            info!(worker_id = worker_id; "created worker at {addr}");
            channels.push(WorkerChannel { worker_id, rx, tx });
        }

        Ok(channels)
    }

    /// Creates a communication channel with some node through its network address.
    async fn open_channel(addr: SocketAddr) -> Result<(NetRx, NetTx), OrchestratorError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| OrchestratorError::ConnectionFailed {
                addr: addr.to_string(),
                source,
            })?;
        let (rx, tx) = stream.into_split();
        Ok(comms::channel(rx, tx))
    }
}
