//! Error types for map-reduce runs.

use thiserror::Error;

/// Errors that can occur while configuring or running a pipeline.
///
/// An empty sample buffer is not an error: it reduces to the reducer's identity.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to allocate {requested_bytes} bytes of scratch storage: {reason}")]
    AllocationFailure {
        requested_bytes: usize,
        reason: String,
    },

    #[error("Pipeline invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("RGBA byte buffer length {len} is not a multiple of 4")]
    MisalignedBytes { len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
