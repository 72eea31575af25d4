use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type of every fallible `RandParamGen` constructor.
pub type Result<T> = std::result::Result<T, RandErr>;

/// Returned whenever a `RandParamGen` can't be built from the given distribution parameters,
/// for example an empty uniform range or a non finite standard deviation.
#[derive(Debug)]
pub struct RandErr(String);

impl From<NormalError> for RandErr {
    fn from(value: NormalError) -> Self {
        Self(format!("invalid normal distribution: {value}"))
    }
}

impl From<UniformError> for RandErr {
    fn from(value: UniformError) -> Self {
        Self(format!("invalid uniform distribution: {value}"))
    }
}

impl From<RandErr> for io::Error {
    fn from(value: RandErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}

impl Display for RandErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RandErr {}
