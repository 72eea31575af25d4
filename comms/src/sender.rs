use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{FrameLen, HEADER_LEN, Serialize};

/// Writes frames to `W`.
///
/// The owned part of every frame is staged in a reused buffer, a borrowed
/// payload follows it without being copied.
pub struct OnoSender<W: AsyncWrite + Unpin> {
    tx: W,
    staging: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            staging: Vec::new(),
        }
    }

    /// Writes `msg` as one frame and flushes it.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.staging.clear();
        self.staging.extend_from_slice(&[0; HEADER_LEN]);

        let payload = msg.serialize(&mut self.staging)?.unwrap_or_default();
        let body_len = self.staging.len() - HEADER_LEN + payload.len();
        self.staging[..HEADER_LEN].copy_from_slice(&(body_len as FrameLen).to_be_bytes());

        self.tx.write_all(&self.staging).await?;
        if !payload.is_empty() {
            self.tx.write_all(payload).await?;
        }

        self.tx.flush().await
    }
}
