//! # Vidframe Core
//!
//! Core types and utilities for the Vidframe framing library.
//!
//! This crate provides the building blocks shared by the per-codec framer
//! crates:
//! - Error handling types
//! - Rational numbers for frame rates and aspect ratios
//! - 27 MHz clock timestamps with an "unset" sentinel
//! - Byte chunk abstractions for incoming stream data
//! - A buffered logical byte stream over a queue of chunks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod clock;
pub mod error;
pub mod rational;
pub mod stream;

pub use chunk::{ByteChunk, ChunkFlags};
pub use clock::{ClockTime, ClockTimes, UCLOCK_FREQ};
pub use error::{Result, StreamError};
pub use rational::Rational;
pub use stream::{BufferStream, ChunkMeta};
