//! Error types for compressed bitmap operations.

use thiserror::Error;

/// Error variants for container and bitmap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A range was empty, reversed, or extended past the value space.
    #[error("invalid range [{begin}, {end})")]
    InvalidRange {
        /// Inclusive lower bound of the rejected range.
        begin: u64,
        /// Exclusive upper bound of the rejected range.
        end: u64,
    },

    /// An array container would hold more values than its representation allows.
    #[error("array container of {len} values exceeds the limit of {max}")]
    CapacityExceeded {
        /// Number of values requested.
        len: usize,
        /// Largest number of values the array may hold.
        max: usize,
    },

    /// Serialized input was truncated or structurally inconsistent.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map a short read onto `InvalidEncoding`; pass every other I/O error through.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::InvalidEncoding("unexpected end of input".to_string())
        } else {
            Error::Io(err)
        }
    }
}

/// A specialized Result type for bitmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Validate a half-open range `[begin, end)` against a value space of `limit` values.
pub(crate) fn check_range(begin: u64, end: u64, limit: u64) -> Result<()> {
    if begin >= end || end > limit {
        return Err(Error::InvalidRange { begin, end });
    }
    Ok(())
}

/// Validate the bounds of a range complement.
///
/// `end` past `limit` is an error. Returns false when `[begin, end)` is empty
/// or reversed, which complements nothing.
pub(crate) fn check_complement_range(begin: u64, end: u64, limit: u64) -> Result<bool> {
    if end > limit {
        return Err(Error::InvalidRange { begin, end });
    }
    Ok(begin < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_is_an_encoding_error() {
        let err = Error::from_read(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, Error::InvalidEncoding(_)));

        let err = Error::from_read(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn check_range_rejects_empty_and_oversized() {
        assert!(check_range(0, 1, 65536).is_ok());
        assert!(check_range(0, 65536, 65536).is_ok());
        assert!(check_range(5, 5, 65536).is_err());
        assert!(check_range(6, 5, 65536).is_err());
        assert!(check_range(0, 65537, 65536).is_err());
    }

    #[test]
    fn complement_range_only_rejects_oversized_ends() {
        assert!(check_complement_range(0, 10, 65536).unwrap());
        assert!(!check_complement_range(10, 10, 65536).unwrap());
        assert!(!check_complement_range(11, 10, 65536).unwrap());
        assert!(matches!(
            check_complement_range(0, 65537, 65536),
            Err(Error::InvalidRange { begin: 0, end: 65537 })
        ));
    }
}
