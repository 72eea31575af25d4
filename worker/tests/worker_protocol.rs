use std::{num::NonZeroUsize, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use tokio::io::{self, AsyncRead, DuplexStream, ReadHalf, WriteHalf};

use worker::{
    Result, Worker, WorkerErr,
    config::WorkerConfig,
    training::{TrainStats, Trainer},
};

/// Gradient `2 * params`, loss `sum(params)`.
struct TestTrainer {
    nparams: usize,
}

impl Trainer for TestTrainer {
    fn nparams(&self) -> usize {
        self.nparams
    }

    fn train(&mut self, params: &[f32], grad: &mut [f32]) -> Result<TrainStats> {
        for (g, p) in grad.iter_mut().zip(params) {
            *g = 2.0 * *p;
        }

        Ok(TrainStats {
            steps: 1,
            reward: 0.5,
            loss: params.iter().sum(),
            terminal: false,
        })
    }
}

type Channel = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

fn channel_pair() -> (Channel, Channel) {
    let (stream1, stream2) = io::duplex(4096);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    (comms::channel(rx1, tx1), comms::channel(rx2, tx2))
}

fn worker(iterations: usize, nparams: usize) -> Worker {
    let config = WorkerConfig::new(0, NonZeroUsize::new(iterations).unwrap());
    Worker::new(config, Box::new(TestTrainer { nparams }))
}

/// Drains the orchestrator end until the worker disconnects, returning the reported losses.
async fn mock_orch<R: AsyncRead + Unpin>(mut rx: OnoReceiver<R>) -> io::Result<Vec<f32>> {
    let mut rx_buf: Vec<u32> = vec![0; 128];
    let mut losses = Vec::new();

    loop {
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::ReportRollout(report)) => losses.push(report.loss),
            Msg::Control(Command::Disconnect) => break,
            other => panic!("unexpected message {}", other.kind()),
        }
    }

    Ok(losses)
}

#[tokio::test]
async fn worker_sends_gradient_on_params() -> io::Result<()> {
    let ((mut sv_rx, mut sv_tx), (wk_rx, wk_tx)) = channel_pair();
    let ((orch_wk_rx, orch_wk_tx), (orch_rx, _orch_tx)) = channel_pair();

    let mut worker = worker(1, 2);

    let worker_fut = async {
        worker
            .run(wk_rx, wk_tx, orch_wk_rx, orch_wk_tx)
            .await
            .map_err(io::Error::from)
    };
    let server_fut = async move {
        let mut params = [1.0, 2.0];
        sv_tx.send(&Msg::Data(Payload::Params(&mut params))).await?;

        let mut rx_buf: Vec<f32> = vec![0.; 128];
        let Msg::Data(Payload::Grad(grad)) = sv_rx.recv_into(&mut rx_buf).await? else {
            panic!("unexpected message");
        };
        assert_eq!(grad, &[2.0, 4.0]);

        let mut params = [3.0, 3.0];
        sv_tx.send(&Msg::Data(Payload::Params(&mut params))).await?;

        let Msg::Control(Command::Disconnect) = sv_rx.recv_into(&mut rx_buf).await? else {
            panic!("unexpected message");
        };
        sv_tx.send(&Msg::Control(Command::Disconnect)).await?;
        Ok::<_, io::Error>(())
    };

    let (_, _, losses) = tokio::try_join!(worker_fut, server_fut, mock_orch(orch_rx))?;
    assert_eq!(losses, vec![3.0]);
    Ok(())
}

#[tokio::test]
async fn replica_is_overwritten_not_merged() -> io::Result<()> {
    let ((mut sv_rx, mut sv_tx), (wk_rx, wk_tx)) = channel_pair();
    let ((orch_wk_rx, orch_wk_tx), (orch_rx, _orch_tx)) = channel_pair();

    let mut worker = worker(3, 2);

    let worker_fut = async {
        worker
            .run(wk_rx, wk_tx, orch_wk_rx, orch_wk_tx)
            .await
            .map_err(io::Error::from)
    };
    let server_fut = async move {
        let rounds = [[1.0, 2.0], [5.0, -3.0], [0.5, 0.25]];
        let mut rx_buf: Vec<f32> = Vec::new();
        let mut grads = Vec::new();

        for mut params in rounds {
            sv_tx.send(&Msg::Data(Payload::Params(&mut params))).await?;
            let Msg::Data(Payload::Grad(grad)) = sv_rx.recv_into(&mut rx_buf).await? else {
                panic!("unexpected message");
            };
            grads.push(grad.to_vec());
        }

        let mut params = [9.0, 9.0];
        sv_tx.send(&Msg::Data(Payload::Params(&mut params))).await?;
        let Msg::Control(Command::Disconnect) = sv_rx.recv_into(&mut rx_buf).await? else {
            panic!("unexpected message");
        };
        sv_tx.send(&Msg::Control(Command::Disconnect)).await?;

        Ok::<_, io::Error>(grads)
    };

    let (_, grads, losses) = tokio::try_join!(worker_fut, server_fut, mock_orch(orch_rx))?;

    assert_eq!(grads, vec![vec![2.0, 4.0], vec![10.0, -6.0], vec![1.0, 0.5]]);
    assert_eq!(losses, vec![3.0, 2.0, 0.75]);
    assert_eq!(worker.replica(), &[0.5, 0.25]);
    assert_eq!(worker.metrics().iterations, 3);
    Ok(())
}

#[tokio::test]
async fn orchestrator_disconnect_stops_the_worker_early() -> io::Result<()> {
    let ((mut sv_rx, mut sv_tx), (wk_rx, wk_tx)) = channel_pair();
    let ((orch_wk_rx, orch_wk_tx), (orch_rx, mut orch_tx)) = channel_pair();

    let mut worker = worker(100, 2);

    let worker_fut = async {
        worker
            .run(wk_rx, wk_tx, orch_wk_rx, orch_wk_tx)
            .await
            .map_err(io::Error::from)
    };
    let server_fut = async move {
        orch_tx.send(&Msg::Control(Command::Disconnect)).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut params = [1.0, 2.0];
        sv_tx.send(&Msg::Data(Payload::Params(&mut params))).await?;

        let mut rx_buf: Vec<f32> = Vec::new();
        let msg = sv_rx.recv_into(&mut rx_buf).await?;
        assert!(matches!(msg, Msg::Control(Command::Disconnect)));
        sv_tx.send(&Msg::Control(Command::Disconnect)).await?;
        Ok::<_, io::Error>(())
    };

    let (_, _, losses) = tokio::try_join!(worker_fut, server_fut, mock_orch(orch_rx))?;
    assert!(losses.is_empty());
    assert_eq!(worker.replica(), &[1.0, 2.0]);
    Ok(())
}

#[tokio::test]
async fn wrong_params_length_is_an_error() {
    let ((_sv_rx, mut sv_tx), (wk_rx, wk_tx)) = channel_pair();
    let ((orch_wk_rx, orch_wk_tx), (_orch_rx, _orch_tx)) = channel_pair();

    let mut worker = worker(1, 2);

    let mut params = [1.0, 2.0, 3.0];
    sv_tx
        .send(&Msg::Data(Payload::Params(&mut params)))
        .await
        .unwrap();

    let ret = worker.run(wk_rx, wk_tx, orch_wk_rx, orch_wk_tx).await;
    assert!(matches!(
        ret,
        Err(WorkerErr::ParamsLengthMismatch {
            got: 3,
            expected: 2
        })
    ));
}

#[tokio::test]
async fn unexpected_server_message_is_an_error() {
    let ((_sv_rx, mut sv_tx), (wk_rx, wk_tx)) = channel_pair();
    let ((orch_wk_rx, orch_wk_tx), (_orch_rx, _orch_tx)) = channel_pair();

    let mut worker = worker(1, 2);
    sv_tx.send(&Msg::Data(Payload::Grad(&[1.0, 2.0]))).await.unwrap();

    let ret = worker.run(wk_rx, wk_tx, orch_wk_rx, orch_wk_tx).await;
    assert!(matches!(
        ret,
        Err(WorkerErr::UnexpectedMessage {
            iteration: 0,
            got: "data/grad"
        })
    ));
}
