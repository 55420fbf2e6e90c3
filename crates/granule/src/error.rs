use granule_path::{Path, PathError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GranuleError {
    #[error("no value at `{0}`")]
    NotFound(Path),
    #[error("value at `{0}` is not an object")]
    NotObject(Path),
    #[error("value at `{0}` is not an array")]
    NotArray(Path),
    #[error("index {index} out of bounds for array `{path}` of length {len}")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },
    #[error("the tree root cannot be replaced")]
    RootAssignment,
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("store is already being mutated")]
    MutationInProgress,
    #[error("nested notification depth exceeded the limit of {limit}")]
    NotifyDepthExceeded { limit: usize },
}
