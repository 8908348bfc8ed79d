use thiserror::Error;

/// Errors from model construction, forward passes and objectives.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] spektra_core::Error),

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dims(expected: impl ToString, got: impl ToString) -> Self {
        Self::DimensionMismatch { expected: expected.to_string(), got: got.to_string() }
    }
}
