use std::{error::Error, fmt, io};

use ndarray::ShapeError;
use puzzle::PuzzleErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Puzzle(PuzzleErr),
    Shape(ShapeError),
    UnexpectedMessage {
        iteration: usize,
        got: &'static str,
    },
    ParamsLengthMismatch {
        got: usize,
        expected: usize,
    },
    GradientLengthMismatch {
        got: usize,
        expected: usize,
    },
    ObservationMismatch {
        features: usize,
        observation: usize,
    },
    ActionsMismatch {
        actions: usize,
        expected: usize,
    },
    EmptyBatch,
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Puzzle(e) => write!(f, "scene error: {e}"),
            WorkerErr::Shape(e) => write!(f, "parameter shape error: {e}"),
            WorkerErr::UnexpectedMessage { iteration, got } => {
                write!(f, "unexpected message at iteration {iteration}: got {got}")
            }
            WorkerErr::ParamsLengthMismatch { got, expected } => {
                write!(f, "params length mismatch: got {got}, expected {expected}")
            }
            WorkerErr::GradientLengthMismatch { got, expected } => {
                write!(f, "gradient length mismatch: got {got}, expected {expected}")
            }
            WorkerErr::ObservationMismatch {
                features,
                observation,
            } => write!(
                f,
                "model expects {features} features but the scene observes {observation}"
            ),
            WorkerErr::ActionsMismatch { actions, expected } => write!(
                f,
                "policy head has {actions} actions but the scene has {expected}"
            ),
            WorkerErr::EmptyBatch => write!(f, "cannot compute a gradient over an empty batch"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Puzzle(e) => Some(e),
            WorkerErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PuzzleErr> for WorkerErr {
    fn from(value: PuzzleErr) -> Self {
        Self::Puzzle(value)
    }
}

impl From<ShapeError> for WorkerErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
