use std::{io, time::Instant};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::worker::RolloutReport,
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::oneshot,
};

use crate::{
    Result, WorkerErr, config::WorkerConfig, metrics::WorkerMetrics, training::Trainer,
};

/// A worker replica: keeps a local copy of the parameters, overwritten by the
/// parameter server before every rollout, and turns each copy into a gradient.
pub struct Worker {
    config: WorkerConfig,
    trainer: Box<dyn Trainer>,
    replica: Vec<f32>,
    grad: Vec<f32>,
    metrics: WorkerMetrics,
}

impl Worker {
    /// Creates a new worker.
    ///
    /// # Args
    /// * `config` - The worker's identity and execution bounds.
    /// * `trainer` - The algorithm turning parameters into gradients.
    pub fn new(config: WorkerConfig, trainer: Box<dyn Trainer>) -> Self {
        let nparams = trainer.nparams();

        Self {
            config,
            trainer,
            replica: vec![0.; nparams],
            grad: vec![0.; nparams],
            metrics: WorkerMetrics::default(),
        }
    }

    /// The last parameters received from the parameter server.
    pub fn replica(&self) -> &[f32] {
        &self.replica
    }

    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }

    /// Runs `max_iterations` round trips against the parameter server, reporting each
    /// rollout to the orchestrator.
    ///
    /// The orchestrator may stop the worker early by sending `Disconnect`, the request
    /// is honored between round trips. Either way the worker says goodbye to both
    /// peers and waits for the server's `Disconnect`.
    ///
    /// # Args
    /// * `ps_rx` - Receiving end of the parameter server channel.
    /// * `ps_tx` - Sending end of the parameter server channel.
    /// * `orch_rx` - Receiving end of the orchestrator channel.
    /// * `orch_tx` - Sending end of the orchestrator channel.
    ///
    /// # Errors
    /// Returns `WorkerErr` on I/O failures, protocol violations or training failures.
    pub async fn run<Rps, Wps, Rorch, Worch>(
        &mut self,
        mut ps_rx: OnoReceiver<Rps>,
        mut ps_tx: OnoSender<Wps>,
        orch_rx: OnoReceiver<Rorch>,
        mut orch_tx: OnoSender<Worch>,
    ) -> Result<()>
    where
        Rps: AsyncRead + Unpin + Send,
        Wps: AsyncWrite + Unpin + Send,
        Rorch: AsyncRead + Unpin + Send + 'static,
        Worch: AsyncWrite + Unpin + Send,
    {
        let worker_id = self.config.worker_id();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_orchestrator(worker_id, orch_rx, stop_tx));

        let mut rx_buf: Vec<f32> = Vec::new();
        let ret = self
            .train_loop(&mut rx_buf, &mut ps_rx, &mut ps_tx, &mut orch_tx, &mut stop_rx)
            .await;
        watcher.abort();
        ret?;

        info!(
            worker_id = worker_id,
            iterations = self.metrics.iterations,
            episodes = self.metrics.episodes;
            "worker finished, disconnecting"
        );

        let msg = Msg::Control(Command::Disconnect);
        orch_tx.send(&msg).await?;
        ps_tx.send(&msg).await?;

        while !matches!(
            ps_rx.recv_into(&mut rx_buf).await?,
            Msg::Control(Command::Disconnect)
        ) {}

        debug!(
            worker_id = worker_id,
            recv_ms = self.metrics.recv_time.as_millis(),
            compute_ms = self.metrics.compute_time.as_millis(),
            send_ms = self.metrics.send_time.as_millis();
            "timings"
        );

        Ok(())
    }

    async fn train_loop<Rps, Wps, Worch>(
        &mut self,
        rx_buf: &mut Vec<f32>,
        ps_rx: &mut OnoReceiver<Rps>,
        ps_tx: &mut OnoSender<Wps>,
        orch_tx: &mut OnoSender<Worch>,
        stop_rx: &mut oneshot::Receiver<()>,
    ) -> Result<()>
    where
        Rps: AsyncRead + Unpin + Send,
        Wps: AsyncWrite + Unpin + Send,
        Worch: AsyncWrite + Unpin + Send,
    {
        let worker_id = self.config.worker_id();

        for iteration in 0..self.config.max_iterations() {
            let start = Instant::now();
            self.recv_params(iteration, rx_buf, ps_rx).await?;
            self.metrics.recv_time += start.elapsed();

            if stop_rx.try_recv().is_ok() {
                info!(worker_id = worker_id, iteration = iteration; "stopped by the orchestrator");
                break;
            }

            let start = Instant::now();
            let stats = self.trainer.train(&self.replica, &mut self.grad)?;
            self.metrics.compute_time += start.elapsed();
            self.metrics.bump_iteration();
            self.metrics.record(&stats);

            let start = Instant::now();
            ps_tx.send(&Msg::Data(Payload::Grad(&self.grad))).await?;
            self.metrics.send_time += start.elapsed();

            debug!(
                worker_id = worker_id,
                iteration = iteration,
                steps = stats.steps,
                loss = stats.loss;
                "sent gradient"
            );

            let report = RolloutReport {
                worker_id,
                iteration,
                steps: stats.steps,
                reward: stats.reward,
                loss: stats.loss,
                terminal: stats.terminal,
            };
            orch_tx
                .send(&Msg::Control(Command::ReportRollout(report)))
                .await?;
        }

        Ok(())
    }

    /// Overwrites the local replica with the next parameters from the server.
    async fn recv_params<R>(
        &mut self,
        iteration: usize,
        rx_buf: &mut Vec<f32>,
        ps_rx: &mut OnoReceiver<R>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        match ps_rx.recv_into(rx_buf).await? {
            Msg::Data(Payload::Params(params)) => {
                if params.len() != self.replica.len() {
                    return Err(WorkerErr::ParamsLengthMismatch {
                        got: params.len(),
                        expected: self.replica.len(),
                    });
                }

                self.replica.copy_from_slice(params);
                Ok(())
            }
            Msg::Err(detail) => {
                warn!(worker_id = self.config.worker_id(); "server error: {detail}");
                Err(io::Error::other(detail.into_owned()).into())
            }
            other => {
                warn!(
                    worker_id = self.config.worker_id(),
                    iteration = iteration;
                    "unexpected message from parameter server: {}",
                    other.kind()
                );

                Err(WorkerErr::UnexpectedMessage {
                    iteration,
                    got: other.kind(),
                })
            }
        }
    }
}

/// Listens to the orchestrator's control plane until it asks the worker to stop.
async fn watch_orchestrator<R>(worker_id: usize, mut rx: OnoReceiver<R>, stop: oneshot::Sender<()>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut rx_buf: Vec<u32> = Vec::new();

    loop {
        match rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Control(Command::Disconnect)) => {
                info!(worker_id = worker_id; "disconnect received from orchestrator");
                let _ = stop.send(());
                return;
            }
            Ok(other) => {
                warn!(worker_id = worker_id; "unexpected message from orchestrator: {}", other.kind());
            }
            Err(e) => {
                debug!(worker_id = worker_id; "orchestrator channel closed: {e}");
                return;
            }
        }
    }
}
