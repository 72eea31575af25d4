use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use puzzle::PuzzleErr;

/// The result type of the condor crate.
pub type Result<T> = std::result::Result<T, CondorErr>;

#[derive(Debug)]
pub enum CondorErr {
    Io(io::Error),
    /// A workspace or chunk file isn't valid JSON for what it should hold.
    Json(serde_json::Error),
    Puzzle(PuzzleErr),
    /// A malformed value was handed to the pipeline, like a zero quota or a
    /// submission argument with spaces.
    InvalidArgument(String),
    /// A task id outside `0..total_chunks`.
    TaskOutOfRange { task_id: usize, total_chunks: usize },
    /// A chunk file that should be there for a merge isn't.
    MissingChunk { task_id: usize, path: PathBuf },
    /// An external program exited unsuccessfully, `status` is `None` when it was killed.
    CommandFailed { command: String, status: Option<i32> },
    UnknownStage(String),
    /// Remote dispatch was requested but the workspace has no remote section.
    NoRemote,
}

impl Display for CondorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "malformed json: {e}"),
            Self::Puzzle(e) => write!(f, "puzzle error: {e}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::TaskOutOfRange {
                task_id,
                total_chunks,
            } => write!(f, "task id {task_id} out of range for {total_chunks} chunks"),
            Self::MissingChunk { task_id, path } => {
                write!(f, "chunk {task_id} is missing, expected {}", path.display())
            }
            Self::CommandFailed { command, status } => match status {
                Some(code) => write!(f, "`{command}` exited with status {code}"),
                None => write!(f, "`{command}` was terminated by a signal"),
            },
            Self::UnknownStage(name) => write!(f, "unknown stage {name}"),
            Self::NoRemote => f.write_str("the workspace has no remote configuration"),
        }
    }
}

impl Error for CondorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Puzzle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CondorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CondorErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<PuzzleErr> for CondorErr {
    fn from(value: PuzzleErr) -> Self {
        Self::Puzzle(value)
    }
}

impl From<CondorErr> for io::Error {
    fn from(value: CondorErr) -> Self {
        match value {
            CondorErr::Io(e) => e,
            CondorErr::MissingChunk { .. } => io::Error::new(io::ErrorKind::NotFound, value),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}
