use std::{env, io};

use comms::msg::{Command, Msg, Payload};
use log::{info, warn};
use tokio::{net::TcpListener, signal};

use parameter_server::service::ServerBuilder;

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

    let (stream, peer) = list.accept().await?;
    let (rx, tx) = stream.into_split();
    let (mut orch_rx, mut orch_tx) = comms::channel(rx, tx);
    info!("orchestrator connected from {peer}");

    let mut rx_buf: Vec<u32> = Vec::new();
    let spec = loop {
        match orch_rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Control(Command::CreateServer(spec))) => break spec,
            Ok(msg) => warn!("expected CreateServer, got {}", msg.kind()),
            Err(e) => return Err(e),
        }
    };

    let workers = spec.workers;
    let mut pserver = ServerBuilder::new().build(spec)?;

    for _ in 0..workers {
        let (stream, peer) = list.accept().await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        info!("worker connected from {peer}");
        pserver.spawn(rx, tx);
    }

    let mut params = tokio::select! {
        ret = pserver.run() => ret?,
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
            return Ok(());
        }
    };

    loop {
        match orch_rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::Disconnect) => break,
            msg => warn!("expected Disconnect, got {}", msg.kind()),
        }
    }

    info!("sending final parameters to the orchestrator");
    orch_tx.send(&Msg::Data(Payload::Params(&mut params))).await
}
