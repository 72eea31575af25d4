use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::{
        server::ServerSpec,
        worker::{RolloutReport, WorkerSpec},
    },
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_KIND: Header = 0;
const CONTROL_KIND: Header = 1;
const GRAD_KIND: Header = 2;
const PARAMS_KIND: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    /// A gradient computed by a worker replica over one rollout.
    Grad(&'a [f32]),
    /// A full copy of the master replica's parameters.
    Params(&'a mut [f32]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateServer(ServerSpec),
    CreateWorker(WorkerSpec),
    ReportRollout(RolloutReport),
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short stable name of the message kind, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::CreateServer(_)) => "control/create_server",
            Msg::Control(Command::CreateWorker(_)) => "control/create_worker",
            Msg::Control(Command::ReportRollout(_)) => "control/report_rollout",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::Grad(_)) => "data/grad",
            Msg::Data(Payload::Params(_)) => "data/params",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_KIND.to_be_bytes());
                serde_json::to_writer(buf, cmd)?;
                Ok(None)
            }
            Msg::Data(payload) => {
                let (kind, nums): (_, &[f32]) = match payload {
                    Payload::Grad(grad) => (GRAD_KIND, grad),
                    Payload::Params(params) => (PARAMS_KIND, params),
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                Ok(Some(bytemuck::cast_slice(nums)))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at_mut(HEADER_SIZE);
        let mut header = [0; HEADER_SIZE];
        header.copy_from_slice(kind_buf);

        match Header::from_be_bytes(header) {
            ERR_KIND => {
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_KIND => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            kind @ (GRAD_KIND | PARAMS_KIND) => {
                let nums: &mut [f32] = bytemuck::try_cast_slice_mut(rest).map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Received a malformed float payload: {err}"),
                    )
                })?;

                let payload = if kind == GRAD_KIND {
                    Payload::Grad(nums)
                } else {
                    Payload::Params(nums)
                };

                Ok(Self::Data(payload))
            }
            kind => Self::invalid_kind_byte(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_body(msg: &Msg<'_>) -> Vec<u32> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf).unwrap().map(<[u8]>::to_vec);
        buf.extend(tail.unwrap_or_default());

        let mut words = vec![0u32; buf.len().div_ceil(4)];
        bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..buf.len()].copy_from_slice(&buf);
        words.truncate(buf.len() / 4);
        words
    }

    #[test]
    fn grad_payload_is_zero_copy() {
        let grad = [1.0_f32, -2.0, 0.5];
        let msg = Msg::Data(Payload::Grad(&grad));

        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf).unwrap();

        assert_eq!(buf, GRAD_KIND.to_be_bytes());
        assert_eq!(tail.unwrap().len(), grad.len() * 4);
    }

    #[test]
    fn params_payload_is_viewed_in_place() {
        let mut params = [3.0_f32, 4.0];
        let mut words = frame_body(&Msg::Data(Payload::Params(&mut params)));
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);

        let Msg::Data(Payload::Params(got)) = Msg::deserialize(bytes).unwrap() else {
            panic!("expected params");
        };
        assert_eq!(got, &[3.0, 4.0]);
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut bytes = 9u32.to_be_bytes().to_vec();
        let err = Msg::deserialize(&mut bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_short_header() {
        let mut bytes = vec![0u8; 2];
        assert!(Msg::deserialize(&mut bytes).is_err());
    }

    #[test]
    fn rejects_ragged_float_payload() {
        let mut bytes = GRAD_KIND.to_be_bytes().to_vec();
        bytes.extend([0u8; 3]);
        assert!(Msg::deserialize(&mut bytes).is_err());
    }
}
