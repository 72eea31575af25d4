use std::{io, num::NonZeroUsize, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
    specs::{
        server::{OptimizerSpec, ParamGenSpec, ServerSpec, SynchronizerSpec},
        worker::{A3cSpec, ModelSpec, SceneSpec, TrainerSpec, ValueRegressionSpec, WorkerSpec},
    },
};
use parameter_server::service::{Server, ServerBuilder};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};

use worker::WorkerBuilder;

const BUF_SIZE: usize = 1 << 16;
const FEATURES: usize = 13;
const ACTIONS: usize = 12;

fn model() -> ModelSpec {
    ModelSpec {
        features: NonZeroUsize::new(FEATURES).unwrap(),
        actions: NonZeroUsize::new(ACTIONS).unwrap(),
    }
}

fn worker_spec(worker_id: usize, iterations: usize, trainer: TrainerSpec) -> WorkerSpec {
    WorkerSpec {
        worker_id,
        max_iterations: NonZeroUsize::new(iterations).unwrap(),
        server_addr: "127.0.0.1:40000".parse().unwrap(),
        model: model(),
        trainer,
        scene: SceneSpec::BoxPuzzle {
            half_extent: 0.5,
            wall: 0.1,
            hole: 0.2,
            probe_range: 2.,
        },
        seed: Some(worker_id as u64),
    }
}

fn server_spec(workers: usize, synchronizer: SynchronizerSpec) -> ServerSpec {
    ServerSpec {
        workers,
        shard_size: NonZeroUsize::new(32).unwrap(),
        param_gen: ParamGenSpec::Const {
            value: 0.,
            limit: model().num_params(),
        },
        optimizer: OptimizerSpec::GradientDescent {
            learning_rate: 0.01,
        },
        synchronizer,
        seed: Some(0),
    }
}

fn a3c() -> TrainerSpec {
    TrainerSpec::A3c(A3cSpec {
        local_t: NonZeroUsize::new(5).unwrap(),
        gamma: 0.99,
        entropy_beta: 0.01,
        // Purely random exploration with long translations, rollouts keep hitting walls.
        epsilon: 0.,
        terminal_value: 1.,
        magnitudes: [0.6, 0.2],
        deltas: [0.025, 0.05],
    })
}

async fn collect_reports<R: AsyncRead + Unpin>(mut rx: OnoReceiver<R>) -> io::Result<usize> {
    let mut rx_buf: Vec<u32> = Vec::new();
    let mut reports = 0;

    loop {
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::ReportRollout(_)) => reports += 1,
            Msg::Control(Command::Disconnect) => return Ok(reports),
            other => panic!("unexpected message {}", other.kind()),
        }
    }
}

/// Asks the worker to stop after `delay`, handing the channel back to keep it open.
async fn stop_after<W: AsyncWrite + Unpin>(
    mut tx: OnoSender<W>,
    delay: Option<Duration>,
) -> OnoSender<W> {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
        // The worker may be gone already.
        let _ = tx.send(&Msg::Control(Command::Disconnect)).await;
    }
    tx
}

/// Runs `specs` against a single parameter server, returning the final parameters and
/// the amount of reports each worker sent.
async fn train(server: ServerSpec, specs: Vec<WorkerSpec>) -> io::Result<(Vec<f32>, Vec<usize>)> {
    let stops = vec![None; specs.len()];
    train_with_stops(server, specs, stops).await
}

/// Like `train`, the orchestrator side of each worker sends `Disconnect` after its
/// delay, if any.
async fn train_with_stops(
    server: ServerSpec,
    specs: Vec<WorkerSpec>,
    stops: Vec<Option<Duration>>,
) -> io::Result<(Vec<f32>, Vec<usize>)> {
    let mut server: Box<dyn Server<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>> =
        ServerBuilder::new().build(server).map_err(io::Error::from)?;

    let mut workers = Vec::new();
    let mut orchestrators = Vec::new();

    for (spec, stop) in specs.into_iter().zip(stops) {
        let (sv_stream, wk_stream) = tokio::io::duplex(BUF_SIZE);
        let (sv_rx, sv_tx) = tokio::io::split(sv_stream);
        let (wk_rx, wk_tx) = tokio::io::split(wk_stream);
        let (sv_rx, sv_tx) = comms::channel(sv_rx, sv_tx);
        let (wk_rx, wk_tx) = comms::channel(wk_rx, wk_tx);
        server.spawn(sv_rx, sv_tx);

        let (orch_stream, wk_orch_stream) = tokio::io::duplex(BUF_SIZE);
        let (orch_rx, orch_tx) = tokio::io::split(orch_stream);
        let (wk_orch_rx, wk_orch_tx) = tokio::io::split(wk_orch_stream);
        let (orch_rx, orch_tx) = comms::channel(orch_rx, orch_tx);
        let (wk_orch_rx, wk_orch_tx) = comms::channel(wk_orch_rx, wk_orch_tx);

        let mut worker = WorkerBuilder::new().build(&spec)?;
        workers.push(tokio::spawn(async move {
            worker.run(wk_rx, wk_tx, wk_orch_rx, wk_orch_tx).await?;
            Ok::<_, io::Error>(worker.replica().to_vec())
        }));
        orchestrators.push(tokio::spawn(async move {
            let (reports, orch_tx) = tokio::join!(collect_reports(orch_rx), stop_after(orch_tx, stop));
            drop(orch_tx);
            reports
        }));
    }

    let params = server.run().await?;

    let mut reports = Vec::new();
    for (worker, orch) in workers.into_iter().zip(orchestrators) {
        let replica = worker.await.map_err(io::Error::other)??;
        assert_eq!(replica.len(), params.len());
        reports.push(orch.await.map_err(io::Error::other)??);
    }

    Ok((params, reports))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a3c_workers_train_against_parameter_server() -> io::Result<()> {
    let specs = (0..3).map(|id| worker_spec(id, 6, a3c())).collect();
    let (params, reports) = train(server_spec(3, SynchronizerSpec::NonBlocking), specs).await?;

    assert_eq!(params.len(), model().num_params());
    assert!(params.iter().all(|p| p.is_finite()));
    assert!(params.iter().any(|&p| p != 0.));
    assert_eq!(reports, vec![6, 6, 6]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn value_regression_only_moves_the_value_head() -> io::Result<()> {
    let trainer = TrainerSpec::ValueRegression(ValueRegressionSpec {
        batch: NonZeroUsize::new(8).unwrap(),
        axis: [1., 0., 0.],
        origin: [0.5, 0., 0.],
    });
    let specs = (0..2).map(|id| worker_spec(id, 4, trainer)).collect();
    let (params, reports) = train(
        server_spec(2, SynchronizerSpec::Barrier { barrier_size: 2 }),
        specs,
    )
    .await?;

    let policy = ACTIONS * FEATURES + ACTIONS;
    assert!(params[..policy].iter().all(|&p| p == 0.));
    assert!(params[policy..].iter().any(|&p| p != 0.));
    assert_eq!(reports, vec![4, 4]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stopping_barrier_synchronized_workers_ends_the_session() -> io::Result<()> {
    const ITERATIONS: usize = 1_000_000;

    let specs = (0..2).map(|id| worker_spec(id, ITERATIONS, a3c())).collect();
    let stops = vec![Some(Duration::from_millis(30)); 2];
    let session = train_with_stops(
        server_spec(2, SynchronizerSpec::Barrier { barrier_size: 2 }),
        specs,
        stops,
    );

    let (params, reports) = tokio::time::timeout(Duration::from_secs(20), session)
        .await
        .map_err(|_| io::Error::other("training never finished after the stop"))??;

    assert!(params.iter().all(|p| p.is_finite()));
    assert!(reports.iter().all(|&r| r < ITERATIONS));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_stopped_worker_leaves_its_peer_training_alone() -> io::Result<()> {
    let specs = vec![worker_spec(0, 1_000_000, a3c()), worker_spec(1, 40, a3c())];
    let stops = vec![Some(Duration::from_millis(30)), None];
    let session = train_with_stops(
        server_spec(2, SynchronizerSpec::Barrier { barrier_size: 2 }),
        specs,
        stops,
    );

    let (_, reports) = tokio::time::timeout(Duration::from_secs(20), session)
        .await
        .map_err(|_| io::Error::other("the peer blocked on the stopped worker"))??;

    assert!(reports[0] < 1_000_000);
    assert_eq!(reports[1], 40);
    Ok(())
}
