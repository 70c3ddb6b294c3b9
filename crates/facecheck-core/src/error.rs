use thiserror::Error;

use crate::store::StorageError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cannot normalize embedding with zero or non-finite norm ({norm})")]
    DegenerateVector { norm: f32 },
    #[error("template storage: {0}")]
    Storage(#[from] StorageError),
}

pub type CoreResult<T> = Result<T, CoreError>;
