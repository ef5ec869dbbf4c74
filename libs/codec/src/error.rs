//! Codec error types.
//!
//! Decoding is deliberately total for correctly-sized input: arbitrary
//! mti values, zero ids and any payload bytes are all legal, so the
//! only failure a caller can see is a buffer of the wrong length.

use thiserror::Error;

/// Errors produced by frame encoding/decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input buffer is not exactly one frame.
    #[error("invalid frame length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
