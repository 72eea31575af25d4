use std::io;

use comms::{OnoReceiver, OnoSender};
use tokio::io::{AsyncRead, AsyncWrite};

/// This trait acts as an indirection layer, allowing the `ServerBuilder` to return
/// differently configured `ParameterServer`s from its single build method.
#[async_trait::async_trait]
pub trait Server<R, W>: Send
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// The amount of parameters of the master replica.
    fn nparams(&self) -> usize;

    /// Indirection method for `ParameterServer::spawn`.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the worker's connection.
    /// * `tx` - The sending end of the worker's connection.
    fn spawn(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>);

    /// Indirection method for `ParameterServer::run`.
    async fn run(&mut self) -> io::Result<Vec<f32>>;
}
