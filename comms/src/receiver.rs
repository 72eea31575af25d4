use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align4, Deserialize, FrameLen, HEADER_LEN, MAX_FRAME_LEN};

/// Reads frames off `R`.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Reads the next frame into `buf` and decodes it.
    ///
    /// `buf` only grows, so reusing it across calls stops allocating once it
    /// fits the largest frame. The decoded message borrows from it, which is
    /// why its elements must be aligned for an in place `f32` view.
    ///
    /// # Errors
    /// `UnexpectedEof` if the peer hangs up mid frame, `InvalidData` for a
    /// frame longer than `MAX_FRAME_LEN` or a body that doesn't decode.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let mut header = [0; HEADER_LEN];
        self.rx.read_exact(&mut header).await?;

        let len = usize::try_from(FrameLen::from_be_bytes(header))
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "frame exceeds the maximum length")
            })?;

        let elems = len.div_ceil(size_of::<B>());
        if buf.len() < elems {
            buf.resize(elems, B::zeroed());
        }

        let body = &mut bytemuck::cast_slice_mut::<B, u8>(buf.as_mut_slice())[..len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
