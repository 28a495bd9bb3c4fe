//! Error types for the temporal algebra engine.

use crate::time::Timestamp;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TempoError>;

/// Errors raised by constructors and operators.
///
/// Operations that legitimately produce "no result" (e.g. a restriction whose
/// domain does not intersect the value) return `Option`/empty collections
/// instead of an error; every variant here is a genuine caller mistake or a
/// malformed encoding.
#[derive(Debug, Error)]
pub enum TempoError {
    /// Malformed input: empty instant list, non-increasing timestamps,
    /// mixed interpolation, invalid bounds.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two temporal values disagree on the value at a shared instant.
    #[error("conflicting values at common instant {at}")]
    ValueConflict { at: Timestamp },

    /// A cast that cannot be expressed, e.g. a linear float sequence to an
    /// integer sequence.
    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    /// An operation mixing incompatible base-value domains.
    #[error("domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A packed encoding that does not follow the wire layout.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A packed encoding truncated mid-structure.
    #[error("unexpected end of input")]
    UnexpectedEof,
}
