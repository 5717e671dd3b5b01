//! Error types for the buffered stream layer.

use thiserror::Error;

/// Errors raised by [`crate::BufferStream`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A requested region extends past the buffered bytes.
    #[error("out of bounds: {requested} bytes at offset {offset}, {available} buffered")]
    OutOfBounds {
        /// Offset of the requested region, relative to the stream position.
        offset: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes currently buffered.
        available: usize,
    },

    /// A buffer could not be allocated or spliced.
    #[error("allocation failure")]
    Alloc,
}

/// Result type alias using [`StreamError`].
pub type Result<T> = std::result::Result<T, StreamError>;
