use std::{env, io};

use comms::msg::{Command, Msg};
use log::{info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    signal,
};

use worker::WorkerBuilder;

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let list = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    let (stream, addr) = list.accept().await?;
    let (rx, tx) = stream.into_split();
    let (mut orch_rx, orch_tx) = comms::channel(rx, tx);
    info!("orchestrator connected from {addr}");

    let mut rx_buf: Vec<u32> = vec![0; 1028];
    let spec = loop {
        match orch_rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Control(Command::CreateWorker(spec))) => break spec,
            Ok(msg) => warn!("expected CreateWorker, got {}", msg.kind()),
            Err(e) => return Err(e),
        }
    };

    let mut worker = WorkerBuilder::new().build(&spec)?;

    let stream = TcpStream::connect(spec.server_addr).await?;
    let (rx, tx) = stream.into_split();
    let (ps_rx, ps_tx) = comms::channel(rx, tx);
    info!(worker_id = spec.worker_id; "connected to parameter server at {}", spec.server_addr);

    tokio::select! {
        ret = worker.run(ps_rx, ps_tx, orch_rx, orch_tx) => {
            ret?;
            info!("wrapping up, disconnecting...");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
