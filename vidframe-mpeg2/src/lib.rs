//! # vidframe-mpeg2
//!
//! Framer for ISO/IEC 13818-2 (MPEG-2) video elementary streams.
//!
//! The framer consumes chunks of encoded video cut at arbitrary byte
//! positions and emits framed pictures: each output buffer contains exactly
//! one coded picture, optionally prefixed by its sequence header, sequence
//! extension, sequence display extension and GOP header, annotated with
//! decoded metadata (picture type, temporal reference, picture number,
//! duration, field flags, random-access flag, propagated PTS/DTS, VBV
//! delay, random-access-point timestamp).
//!
//! ## Example
//!
//! ```rust,ignore
//! use vidframe_core::ByteChunk;
//! use vidframe_mpeg2::{Mpeg2Framer, EXPECTED_FLOW_DEF};
//!
//! let mut framer = Mpeg2Framer::new(EXPECTED_FLOW_DEF)?;
//! framer.set_output(Box::new(my_sink));
//! framer.input(ByteChunk::new(chunk_bytes));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod flow;
pub mod framer;
pub mod headers;
pub mod scan;
pub mod types;

mod cache;

pub use flow::{FlowDef, PlaneDef};
pub use framer::{FrameSink, FramedPicture, FramerEvent, Mpeg2Framer, PictureFlags};
pub use types::{
    AspectRatio, ChromaFormat, GopHeader, Level, PictureCodingExtension, PictureCodingType,
    PictureHeader, PictureStructure, SequenceDisplayExtension, SequenceExtension, SequenceHeader,
};

use thiserror::Error;
use vidframe_core::StreamError;

/// Framing error types.
#[derive(Error, Debug)]
pub enum Mpeg2Error {
    /// Invalid start code prefix.
    #[error("invalid start code: expected 0x000001{expected:02X}, got {found:#010x}")]
    InvalidStartCode {
        /// Expected start code value.
        expected: u8,
        /// The 32-bit word actually found.
        found: u32,
    },

    /// Invalid or reserved frame rate code.
    #[error("invalid frame rate code {0}")]
    InvalidFrameRate(u8),

    /// Unsupported level in the profile_and_level indication.
    #[error("invalid level {0}")]
    UnsupportedLevel(u8),

    /// Reserved chroma format code.
    #[error("invalid chroma format {0}")]
    UnsupportedChromaFormat(u8),

    /// Invalid or reserved aspect ratio code.
    #[error("invalid aspect ratio {0}")]
    InvalidAspectRatio(u8),

    /// Invalid extension start code identifier.
    #[error("invalid extension identifier {0}")]
    InvalidExtensionId(u8),

    /// Reserved picture coding type.
    #[error("invalid picture coding type {0}")]
    InvalidPictureType(u8),

    /// Reserved picture structure code.
    #[error("invalid picture structure {0}")]
    InvalidPictureStructure(u8),

    /// A header region ended before the required field bits.
    #[error("insufficient data: need {needed} bytes, have {available}")]
    InsufficientData {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// A single frame grew past the sanity cap.
    #[error("frame exceeds maximum size of {max} bytes")]
    FrameTooLarge {
        /// The configured cap.
        max: usize,
    },

    /// The input flow definition does not describe an MPEG-2 video stream.
    #[error("invalid flow definition {0:?}")]
    InvalidFlowDef(String),

    /// No sequence header has been cached yet.
    #[error("no sequence header")]
    NoSequence,

    /// Buffered stream access failure.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl Mpeg2Error {
    /// Check whether this error denotes an unsupported-but-well-framed
    /// stream (bad framerate/level/chroma/aspect codes), as opposed to a
    /// framing failure that requires resynchronization.
    #[must_use]
    pub fn is_invalid_stream(&self) -> bool {
        matches!(
            self,
            Mpeg2Error::InvalidFrameRate(_)
                | Mpeg2Error::UnsupportedLevel(_)
                | Mpeg2Error::UnsupportedChromaFormat(_)
                | Mpeg2Error::InvalidAspectRatio(_)
        )
    }
}

/// Result type for framing operations.
pub type Result<T> = std::result::Result<T, Mpeg2Error>;

/// Flow definition prefix accepted on input and carried on output.
pub const EXPECTED_FLOW_DEF: &str = "block.mpeg2video.";

/// Sequence header start code.
pub const SEQUENCE_HEADER_CODE: u8 = 0xB3;

/// Extension start code (sequence, display and picture coding extensions).
pub const EXTENSION_START_CODE: u8 = 0xB5;

/// Group of Pictures start code.
pub const GOP_START_CODE: u8 = 0xB8;

/// Picture start code.
pub const PICTURE_START_CODE: u8 = 0x00;

/// Sequence end code.
pub const SEQUENCE_END_CODE: u8 = 0xB7;

/// User data start code.
pub const USER_DATA_START_CODE: u8 = 0xB2;

/// Minimum slice start code.
pub const SLICE_START_CODE_MIN: u8 = 0x01;
/// Maximum slice start code.
pub const SLICE_START_CODE_MAX: u8 = 0xAF;

/// Extension identifier of the sequence extension.
pub const SEQUENCE_EXTENSION_ID: u8 = 0x1;
/// Extension identifier of the sequence display extension.
pub const SEQUENCE_DISPLAY_EXTENSION_ID: u8 = 0x2;
/// Extension identifier of the picture coding extension.
pub const PICTURE_CODING_EXTENSION_ID: u8 = 0x8;

/// Fixed size of a sequence header, start code included, without quantiser
/// matrices.
pub const SEQUENCE_HEADER_SIZE: usize = 12;
/// Size of one optional quantiser matrix in a sequence header.
pub const QUANT_MATRIX_SIZE: usize = 64;
/// Size of a sequence extension, start code included.
pub const SEQUENCE_EXTENSION_SIZE: usize = 10;
/// Size of a sequence display extension without colour description,
/// start code included.
pub const SEQUENCE_DISPLAY_SIZE: usize = 9;
/// Extra bytes of a sequence display extension carrying colour description.
pub const SEQUENCE_DISPLAY_COLOR_SIZE: usize = 3;
/// Size of a GOP header, start code included.
pub const GOP_HEADER_SIZE: usize = 8;
/// Size of the fixed part of a picture header, start code included.
pub const PICTURE_HEADER_SIZE: usize = 8;
/// Size of the fixed part of a picture coding extension, start code
/// included.
pub const PICTURE_EXTENSION_SIZE: usize = 9;

/// Sanity cap on the size of a single frame; larger frames are treated as a
/// malformed stream.
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;
