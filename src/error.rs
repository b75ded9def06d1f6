//! Error types for buffer operations.
//!
//! Every failure in this crate is local and recoverable: an operation that
//! returns an error has left its buffer exactly as it found it.

use thiserror::Error;

/// Errors returned by buffer, codec and screen operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// An index or range reaches past the end of the buffer.
    #[error("index {index} out of range for length {len}")]
    OutOfRange {
        /// The offending index (or range end).
        index: usize,
        /// The length it was checked against.
        len: usize,
    },

    /// The caller passed an argument that can never be valid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Encoded data could not be decoded.
    #[error("malformed data: {0}")]
    MalformedData(String),
}

impl BufferError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedData(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BufferError>;

/// Validate that `range` is well formed and lies within `0..len`.
pub(crate) fn check_range(range: &std::ops::Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end {
        return Err(BufferError::invalid(format!(
            "range start {} is past its end {}",
            range.start, range.end
        )));
    }
    if range.end > len {
        return Err(BufferError::OutOfRange {
            index: range.end,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(&(0..0), 0).is_ok());
        assert!(check_range(&(2..5), 5).is_ok());
        assert_eq!(
            check_range(&(2..6), 5),
            Err(BufferError::OutOfRange { index: 6, len: 5 })
        );
        #[allow(clippy::reversed_empty_ranges)]
        let backwards = 4..2;
        assert!(matches!(
            check_range(&backwards, 5),
            Err(BufferError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_display() {
        let err = BufferError::OutOfRange { index: 9, len: 3 };
        assert_eq!(err.to_string(), "index 9 out of range for length 3");
    }
}
