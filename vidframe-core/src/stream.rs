//! A buffered logical byte stream over a queue of chunks.
//!
//! Framers receive data as chunks cut at arbitrary byte positions. The
//! [`BufferStream`] exposes the queue as a single logical byte stream with
//! random-access peeking and front extraction, while tracking the pending
//! timestamps that the next extracted region must inherit.
//!
//! Timestamp promotion: whenever a chunk becomes the head of the queue
//! (appended to an empty queue, or uncovered by consuming the previous
//! head), every timestamp channel it carries overwrites the corresponding
//! pending channel. Channels it leaves unset keep their previous pending
//! value.

use crate::chunk::{ByteChunk, ChunkFlags};
use crate::clock::{ClockTime, ClockTimes};
use crate::error::{Result, StreamError};
use bytes::Bytes;
use std::collections::VecDeque;

/// Metadata inherited by a region extracted from the stream, taken from the
/// chunk that contained the region's first byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkMeta {
    /// Random-access-point system time carried by the chunk.
    pub systime_rap: ClockTime,
    /// Flags carried by the chunk.
    pub flags: ChunkFlags,
}

/// A queue of chunks exposed as one logical byte stream.
#[derive(Debug, Default)]
pub struct BufferStream {
    chunks: VecDeque<ByteChunk>,
    /// Bytes already consumed from the head chunk.
    head_offset: usize,
    /// Total unconsumed bytes across the queue.
    available: usize,
    /// Timestamps latched at chunk promotion, not yet bound to a frame.
    pending: ClockTimes,
}

impl BufferStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unconsumed bytes buffered.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Check whether no unconsumed bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Enqueue a chunk at the back of the stream.
    pub fn push(&mut self, chunk: ByteChunk) {
        let was_empty = self.chunks.is_empty();
        self.available += chunk.len();
        self.chunks.push_back(chunk);
        if was_empty {
            self.promote();
        }
        self.normalize();
    }

    /// Zero-copy access to the contiguous run starting at `offset`.
    ///
    /// Returns the longest slice beginning at `offset` that lies within a
    /// single chunk, or `None` when `offset` is at or past the end of the
    /// buffered bytes.
    pub fn read_span(&self, offset: usize) -> Option<&[u8]> {
        let mut off = self.head_offset + offset;
        for chunk in &self.chunks {
            if off < chunk.len() {
                return Some(&chunk.data[off..]);
            }
            off -= chunk.len();
        }
        None
    }

    /// Peek one byte at `offset`.
    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.read_span(offset).map(|span| span[0])
    }

    /// Split off the first `len` bytes as a chain of zero-copy segments,
    /// together with the metadata of the chunk that held the first byte.
    pub fn extract(&mut self, len: usize) -> Result<(Vec<Bytes>, ChunkMeta)> {
        if len > self.available {
            return Err(StreamError::OutOfBounds {
                offset: 0,
                requested: len,
                available: self.available,
            });
        }
        let meta = self.head_meta().unwrap_or_default();
        let mut segments = Vec::new();
        let mut remaining = len;
        while remaining > 0 {
            // len <= available guarantees a head chunk here
            let Some(head) = self.chunks.front() else {
                return Err(StreamError::Alloc);
            };
            let head_remaining = head.len() - self.head_offset;
            if remaining >= head_remaining {
                segments.push(head.data.slice(self.head_offset..));
                self.chunks.pop_front();
                self.head_offset = 0;
                self.available -= head_remaining;
                remaining -= head_remaining;
                if !self.chunks.is_empty() {
                    self.promote();
                }
            } else {
                segments.push(head.data.slice(self.head_offset..self.head_offset + remaining));
                self.head_offset += remaining;
                self.available -= remaining;
                remaining = 0;
            }
        }
        self.normalize();
        Ok((segments, meta))
    }

    /// Extract and discard the first `len` bytes.
    pub fn consume(&mut self, len: usize) -> Result<()> {
        self.extract(len).map(|_| ())
    }

    /// Metadata of the current head chunk, if any.
    pub fn head_meta(&self) -> Option<ChunkMeta> {
        self.chunks.front().map(|chunk| ChunkMeta {
            systime_rap: chunk.systime_rap,
            flags: chunk.flags,
        })
    }

    /// Flag the current head chunk as carrying erroneous data.
    pub fn mark_head_error(&mut self) {
        if let Some(head) = self.chunks.front_mut() {
            head.flags |= ChunkFlags::ERROR;
        }
    }

    /// Copy of the pending timestamp channels.
    pub fn pending_times(&self) -> ClockTimes {
        self.pending
    }

    /// Freeze the pending timestamps: returns them and resets every channel
    /// to unset, so later declarations attach to the next frame.
    pub fn take_times(&mut self) -> ClockTimes {
        std::mem::take(&mut self.pending)
    }

    /// Drop the pending PTS channels.
    pub fn flush_pts(&mut self) {
        self.pending.clear_pts();
    }

    /// Drop the pending DTS channels.
    pub fn flush_dts(&mut self) {
        self.pending.clear_dts();
    }

    /// Derive pending DTS channels from an emitted frame: every channel
    /// still unset becomes the emitted value advanced by `duration`.
    ///
    /// Keeps DTS monotonic across frame boundaries when the carrier only
    /// timestamps sporadically.
    pub fn backfill_dts(&mut self, emitted: &ClockTimes, duration: u64) {
        macro_rules! backfill_channel {
            ($name:ident) => {
                if !self.pending.$name.is_set() && emitted.$name.is_set() {
                    self.pending.$name = emitted.$name + duration;
                }
            };
        }
        backfill_channel!(dts_orig);
        backfill_channel!(dts);
        backfill_channel!(dts_sys);
    }

    /// Wipe the queue and the pending state.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.head_offset = 0;
        self.available = 0;
        self.pending = ClockTimes::UNSET;
    }

    /// Latch the head chunk's timestamps into the pending channels.
    fn promote(&mut self) {
        let times = match self.chunks.front() {
            Some(head) => head.times,
            None => return,
        };
        self.pending.merge(&times);
    }

    /// Pop exhausted head chunks so the head always has unconsumed bytes.
    fn normalize(&mut self) {
        while let Some(head) = self.chunks.front() {
            if head.len() > self.head_offset {
                break;
            }
            self.chunks.pop_front();
            self.head_offset = 0;
            if !self.chunks.is_empty() {
                self.promote();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_pts(data: &[u8], pts: u64) -> ByteChunk {
        let mut times = ClockTimes::UNSET;
        times.pts = ClockTime::new(pts);
        ByteChunk::new(data.to_vec()).with_times(times)
    }

    #[test]
    fn test_push_and_available() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2, 3]));
        stream.push(ByteChunk::new(vec![4, 5]));
        assert_eq!(stream.available(), 5);
    }

    #[test]
    fn test_read_span_within_one_chunk() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2, 3]));
        stream.push(ByteChunk::new(vec![4, 5]));
        assert_eq!(stream.read_span(1), Some(&[2u8, 3][..]));
        assert_eq!(stream.read_span(3), Some(&[4u8, 5][..]));
        assert_eq!(stream.read_span(5), None);
    }

    #[test]
    fn test_peek_byte_spans_chunks() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2, 3]));
        stream.push(ByteChunk::new(vec![4, 5]));
        assert_eq!(stream.peek_byte(2), Some(3));
        assert_eq!(stream.peek_byte(3), Some(4));
        assert_eq!(stream.peek_byte(5), None);
    }

    #[test]
    fn test_extract_spans_chunks() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2, 3]));
        stream.push(ByteChunk::new(vec![4, 5]));
        let (segments, _) = stream.extract(4).unwrap();
        let joined: Vec<u8> = segments.iter().flat_map(|s| s.iter().copied()).collect();
        assert_eq!(joined, vec![1, 2, 3, 4]);
        assert_eq!(stream.available(), 1);
        assert_eq!(stream.read_span(0), Some(&[5u8][..]));
    }

    #[test]
    fn test_extract_out_of_bounds() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2]));
        assert!(stream.extract(3).is_err());
    }

    #[test]
    fn test_promotion_on_push_to_empty() {
        let mut stream = BufferStream::new();
        stream.push(chunk_with_pts(&[1, 2], 1000));
        assert_eq!(stream.pending_times().pts, ClockTime::new(1000));
    }

    #[test]
    fn test_promotion_on_head_exhaustion() {
        let mut stream = BufferStream::new();
        stream.push(chunk_with_pts(&[1, 2], 1000));
        stream.push(chunk_with_pts(&[3, 4], 2000));
        // Second chunk not promoted yet.
        assert_eq!(stream.pending_times().pts, ClockTime::new(1000));
        stream.consume(2).unwrap();
        assert_eq!(stream.pending_times().pts, ClockTime::new(2000));
    }

    #[test]
    fn test_promotion_merge_keeps_unset_channels() {
        let mut stream = BufferStream::new();
        let mut times = ClockTimes::UNSET;
        times.dts = ClockTime::new(500);
        stream.push(ByteChunk::new(vec![1]).with_times(times));
        // Next chunk only declares a PTS; the pending DTS must survive.
        stream.push(chunk_with_pts(&[2], 1000));
        stream.consume(1).unwrap();
        let pending = stream.pending_times();
        assert_eq!(pending.dts, ClockTime::new(500));
        assert_eq!(pending.pts, ClockTime::new(1000));
    }

    #[test]
    fn test_take_times_freezes() {
        let mut stream = BufferStream::new();
        stream.push(chunk_with_pts(&[1], 1000));
        let frozen = stream.take_times();
        assert_eq!(frozen.pts, ClockTime::new(1000));
        assert!(!stream.pending_times().any_set());
    }

    #[test]
    fn test_backfill_dts() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1]));
        let mut emitted = ClockTimes::UNSET;
        emitted.dts = ClockTime::new(900);
        stream.backfill_dts(&emitted, 100);
        assert_eq!(stream.pending_times().dts, ClockTime::new(1000));
        // A channel the emitted frame lacked stays unset.
        assert!(!stream.pending_times().dts_sys.is_set());
    }

    #[test]
    fn test_extract_meta_from_head() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1, 2]).with_systime_rap(ClockTime::new(77)));
        stream.push(ByteChunk::new(vec![3, 4]));
        let (_, meta) = stream.extract(3).unwrap();
        assert_eq!(meta.systime_rap, ClockTime::new(77));
    }

    #[test]
    fn test_mark_head_error() {
        let mut stream = BufferStream::new();
        stream.push(ByteChunk::new(vec![1]));
        stream.mark_head_error();
        let (_, meta) = stream.extract(1).unwrap();
        assert!(meta.flags.contains(ChunkFlags::ERROR));
    }

    #[test]
    fn test_reset() {
        let mut stream = BufferStream::new();
        stream.push(chunk_with_pts(&[1, 2], 1000));
        stream.reset();
        assert!(stream.is_empty());
        assert!(!stream.pending_times().any_set());
    }
}
