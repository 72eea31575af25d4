use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type of every length checked storage operation.
pub type Result<T> = std::result::Result<T, SizeMismatchErr>;

/// Returned whenever a gradient, a parameter buffer or an output buffer doesn't match
/// the amount of parameters held by the store or one of its shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr;

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the provided buffer length doesn't match the amount of stored parameters")
    }
}

impl Error for SizeMismatchErr {}

impl From<SizeMismatchErr> for io::Error {
    fn from(value: SizeMismatchErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}
