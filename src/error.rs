use std::path::PathBuf;
use thiserror::Error;

/// Typed failures raised while serving a single request
///
/// None of these are fatal to the service: the server turns each one into
/// an `error` response and keeps reading.
#[derive(Error, Debug)]
pub enum DepthError {
    #[error("model output has rank {0}, expected at least 2")]
    OutputRank(usize),

    #[error("depth surface is empty ({height}x{width})")]
    EmptySurface { height: usize, width: usize },

    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}
