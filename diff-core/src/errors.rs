//! Crate-wide error hierarchy for diff-core.

use thiserror::Error;

pub type DiffCoreResult<T> = Result<T, ParseError>;

/// Unified diff parser errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    #[error("negative hunk count in header: {0}")]
    NegativeCount(String),

    #[error("hunk line count invariant violated at {path} @@ -{old_start},{old_count}: {reason}")]
    CountMismatch { path: String, old_start: u32, old_count: u32, reason: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("integer overflow computing line range")]
    Overflow,
}
