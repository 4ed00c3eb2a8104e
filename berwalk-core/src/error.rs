use thiserror::Error;

/// Structural decoding failure
///
/// Only conditions that make the rest of a buffer untrustworthy are reported
/// through this type: reads past the end, offsets that stop advancing, runaway
/// nesting. Everything recoverable (wrong tags, missing fields, constraint
/// violations) is recorded as a [`Diagnostic`](crate::Diagnostic) instead.
#[derive(Error, Debug)]
pub enum BerError {
    #[error("Bounds violation at offset {offset}: need {needed} bytes, {available} available")]
    BoundsViolation {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Short frame at offset {offset}: need {needed} bytes, only {available} captured")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Nesting depth {depth} exceeds the maximum")]
    NestingTooDeep { depth: usize },

    #[error("Offset did not advance at {offset}")]
    NoProgress { offset: usize },

    #[error("Tag number at offset {offset} does not fit in 32 bits")]
    TagOverflow { offset: usize },

    #[error("Length at offset {offset} uses {octets} octets, too large to represent")]
    LengthOverflow { offset: usize, octets: usize },

    #[error("Length {length} at offset {offset} exceeds the {available} remaining bytes")]
    LengthExceedsBuffer {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("Indefinite length at offset {offset} has no end-of-contents marker")]
    MissingEndOfContents { offset: usize },

    #[error("Invalid constructed OCTET STRING fragment at offset {offset}")]
    InvalidFragment { offset: usize },

    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BerError {
    /// Whether the failure came from a capture that was cut short rather than
    /// from an inconsistent encoding
    pub fn is_truncation(&self) -> bool {
        matches!(self, BerError::Truncated { .. })
    }
}

/// Result type alias for berwalk operations
pub type BerResult<T> = Result<T, BerError>;
