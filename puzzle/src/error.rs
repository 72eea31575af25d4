use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type of the puzzle crate.
pub type Result<T> = std::result::Result<T, PuzzleErr>;

#[derive(Debug, Clone, PartialEq)]
pub enum PuzzleErr {
    /// The action index is outside `0..NUM_ACTIONS`.
    InvalidAction(usize),
    /// A scene can't be built from the given dimensions.
    InvalidGeometry(String),
    /// A sampling procedure was asked to start from a colliding configuration.
    InvalidKey,
    /// No valid and entangled configuration was found.
    NoValidState { attempts: usize },
    /// An observation buffer doesn't fit the scene's observation length.
    ObservationSize { expected: usize, got: usize },
}

impl Display for PuzzleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAction(action) => write!(f, "invalid action {action}"),
            Self::InvalidGeometry(reason) => write!(f, "invalid scene geometry: {reason}"),
            Self::InvalidKey => f.write_str("the key configuration collides with the scene"),
            Self::NoValidState { attempts } => {
                write!(f, "no valid configuration found after {attempts} attempts")
            }
            Self::ObservationSize { expected, got } => {
                write!(f, "observation buffer has {got} elements, expected {expected}")
            }
        }
    }
}

impl Error for PuzzleErr {}

impl From<PuzzleErr> for io::Error {
    fn from(value: PuzzleErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}
