//! Length prefixed framing of the messages exchanged between the orchestrator,
//! the parameter server and the workers.
//!
//! A frame is a big endian `u64` body length followed by the body. Float
//! payloads are written straight from the caller's slice and viewed in place on
//! the receiving end.

mod align;
mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod specs;

use tokio::io::{AsyncRead, AsyncWrite};

pub use align::{Align1, Align4};
pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

type FrameLen = u64;
const HEADER_LEN: usize = size_of::<FrameLen>();

/// Largest body a receiver accepts, a corrupt header must not make it allocate
/// without bound.
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Wraps a reader and a writer into both ends of a channel.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
