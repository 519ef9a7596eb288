use thiserror::Error;

/// Failure modes of the linear-algebra kernel.
///
/// None of these occur on the filter's hot path (`process_imu`/`process_gps`
/// never invert a matrix); this exists for callers that use [`crate::linalg`]
/// directly.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LinalgError {
    #[error("matrix is singular (|det| < 1e-10)")]
    Singular,
}
