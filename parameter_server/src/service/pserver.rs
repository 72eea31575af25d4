use std::io;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};

use super::Server;
use crate::{
    storage::{Store, StoreHandle},
    synchronization::Synchronizer,
};

/// The master replica's service, it owns one task per connected worker replica.
///
/// Each worker task runs a blocking round trip per rollout: the worker replica is
/// overwritten with the current parameters, then the task waits for either a gradient
/// or a disconnection.
pub struct ParameterServer<S, Sy>
where
    S: Store,
    Sy: Synchronizer,
{
    tasks: JoinSet<io::Result<usize>>,
    handle: StoreHandle<S>,
    synchronizer: Sy,
    next_worker_id: usize,
}

impl<S, Sy> ParameterServer<S, Sy>
where
    S: Store + Send + Sync + 'static,
    Sy: Synchronizer + Sync + 'static,
{
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `handle` - The master replica's store.
    /// * `synchronizer` - How gradients from different workers are combined.
    pub fn new(handle: StoreHandle<S>, synchronizer: Sy) -> Self {
        Self {
            tasks: JoinSet::new(),
            handle,
            synchronizer,
            next_worker_id: 0,
        }
    }

    /// Binds a new worker to this server and spawns its serving task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the worker's connection.
    /// * `tx` - The sending end of the worker's connection.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let worker_id = self.next_worker_id;
        self.next_worker_id += 1;

        let handle = self.handle.clone();
        let synchronizer = self.synchronizer.clone();

        debug!(worker_id = worker_id; "spawning worker task");
        self.tasks
            .spawn(serve_worker(worker_id, handle, synchronizer, rx, tx));
    }

    /// Waits for every worker task to finish and returns the final parameters.
    ///
    /// # Returns
    /// The first io error of any worker task.
    pub async fn run(&mut self) -> io::Result<Vec<f32>> {
        while let Some(res) = self.tasks.join_next().await {
            let rounds = res.map_err(io::Error::other)??;
            debug!(rounds = rounds; "worker task finished");
        }

        let mut params = vec![0.; self.handle.len()];
        self.handle.pull_params(&mut params).await?;
        info!(nparams = params.len(); "training finished");
        Ok(params)
    }
}

/// Serves one worker replica until it disconnects.
///
/// # Returns
/// The amount of gradients received from the worker.
async fn serve_worker<S, Sy, R, W>(
    worker_id: usize,
    handle: StoreHandle<S>,
    synchronizer: Sy,
    mut rx: OnoReceiver<R>,
    mut tx: OnoSender<W>,
) -> io::Result<usize>
where
    S: Store + Send + Sync,
    Sy: Synchronizer,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut params = vec![0.; handle.len()];
    let mut rx_buf: Vec<f32> = Vec::new();
    let mut rounds = 0;

    handle.pull_params(&mut params).await?;

    loop {
        tx.send(&Msg::Data(Payload::Params(&mut params))).await?;

        match rx.recv_into(&mut rx_buf).await? {
            Msg::Data(Payload::Grad(grad)) => {
                synchronizer.step(&handle, grad, &mut params).await?;
                rounds += 1;
            }
            Msg::Control(Command::Disconnect) => {
                debug!(worker_id = worker_id, rounds = rounds; "worker disconnected");
                synchronizer.leave(&handle).await?;
                tx.send(&Msg::Control(Command::Disconnect)).await?;
                return Ok(rounds);
            }
            msg => {
                warn!(worker_id = worker_id, kind = msg.kind(); "unexpected message");
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("worker {worker_id} sent an unexpected {}", msg.kind()),
                ));
            }
        }
    }
}

#[async_trait::async_trait]
impl<R, W, S, Sy> Server<R, W> for ParameterServer<S, Sy>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Store + Send + Sync + 'static,
    Sy: Synchronizer + Sync + 'static,
{
    fn nparams(&self) -> usize {
        self.handle.len()
    }

    fn spawn(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>) {
        self.spawn(rx, tx)
    }

    async fn run(&mut self) -> io::Result<Vec<f32>> {
        self.run().await
    }
}
