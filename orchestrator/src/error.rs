use std::{fmt, io};

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before connecting.
    InvalidConfig(String),
    /// The configuration file isn't valid JSON for a `TrainingConfig`.
    Parse(serde_json::Error),
    /// Failed to connect to a worker or server.
    ConnectionFailed { addr: String, source: io::Error },
    /// A worker produced an unrecoverable error during training.
    WorkerError { worker_id: usize, msg: String },
    /// The parameter server produced an unrecoverable error.
    ServerError(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Parse(e) => write!(f, "malformed config: {e}"),
            Self::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            Self::WorkerError { worker_id, msg } => {
                write!(f, "worker {worker_id} error: {msg}")
            }
            Self::ServerError(msg) => write!(f, "server error: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<OrchestratorError> for io::Error {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Io(e) => e,
            OrchestratorError::ConnectionFailed { source, .. } => source,
            other => io::Error::other(other),
        }
    }
}
