//! Chunk abstractions for incoming encoded stream data.
//!
//! Chunks are the unit of input to a framer: opaque byte buffers carrying
//! optional timing and discontinuity metadata from the upstream carrier.

use crate::clock::{ClockTime, ClockTimes};
use bitflags::bitflags;
use bytes::Bytes;
use std::fmt;

bitflags! {
    /// Flags for chunk properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFlags: u32 {
        /// The chunk follows a break in the input stream.
        const DISCONTINUITY = 0x0001;
        /// The chunk data may be corrupted.
        const ERROR = 0x0002;
    }
}

/// An incoming chunk of encoded stream data.
///
/// Chunk data is reference-counted, so slicing a chunk into output frames
/// never copies payload bytes.
#[derive(Clone)]
pub struct ByteChunk {
    /// The chunk payload. Empty for metadata-only markers.
    pub data: Bytes,
    /// Timestamps declared for the first access unit starting in this chunk.
    pub times: ClockTimes,
    /// System time of the latest random access point, as known upstream.
    pub systime_rap: ClockTime,
    /// Chunk flags.
    pub flags: ChunkFlags,
}

impl ByteChunk {
    /// Create a new chunk from payload bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            times: ClockTimes::UNSET,
            systime_rap: ClockTime::UNSET,
            flags: ChunkFlags::empty(),
        }
    }

    /// Create a metadata-only marker chunk with no payload.
    pub fn marker() -> Self {
        Self::new(Bytes::new())
    }

    /// Get the payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this chunk carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set the timestamp channels.
    pub fn with_times(mut self, times: ClockTimes) -> Self {
        self.times = times;
        self
    }

    /// Set the random-access-point system time.
    pub fn with_systime_rap(mut self, systime_rap: ClockTime) -> Self {
        self.systime_rap = systime_rap;
        self
    }

    /// Mark the chunk as following an input discontinuity.
    pub fn with_discontinuity(mut self) -> Self {
        self.flags |= ChunkFlags::DISCONTINUITY;
        self
    }
}

impl fmt::Debug for ByteChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteChunk")
            .field("len", &self.len())
            .field("times", &self.times)
            .field("systime_rap", &self.systime_rap)
            .field("flags", &self.flags)
            .finish()
    }
}
