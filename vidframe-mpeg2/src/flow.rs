//! Output flow definition.
//!
//! A flow definition describes the elementary stream to downstream
//! consumers. It is derived from the sequence header and its extensions,
//! and re-emitted only when the sequence actually changes.

use vidframe_core::Rational;

/// A picture plane descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlaneDef {
    /// Horizontal subsampling.
    pub hsub: u8,
    /// Vertical subsampling.
    pub vsub: u8,
    /// Size of a macropixel in this plane, in bytes.
    pub macropixel_size: u8,
    /// Plane name.
    pub name: &'static str,
}

/// Flow definition of a framed MPEG-2 video stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlowDef {
    /// Flow definition string, e.g. `"block.mpeg2video.pic.planar8_8_420."`.
    pub def: String,
    /// Frames per second.
    pub fps: Rational,
    /// Maximum stream rate allowed by the advertised level, in bytes per
    /// second.
    pub max_octetrate: u64,
    /// Declared stream rate, in bytes per second.
    pub octetrate: u64,
    /// Coded picture buffer size, in bytes.
    pub cpb_buffer: u64,
    /// Coded horizontal size.
    pub hsize: u32,
    /// Coded vertical size.
    pub vsize: u32,
    /// Visible horizontal size, when a sequence display extension was
    /// present.
    pub hsize_visible: Option<u32>,
    /// Visible vertical size, when a sequence display extension was
    /// present.
    pub vsize_visible: Option<u32>,
    /// Sample aspect ratio.
    pub sar: Rational,
    /// Raw profile_and_level byte, when a sequence extension was present.
    pub profile_level: Option<u8>,
    /// Low delay flag.
    pub lowdelay: bool,
    /// Number of pixels in a macropixel.
    pub macropixel: u8,
    /// Picture plane descriptors, luma first.
    pub planes: Vec<PlaneDef>,
}

impl FlowDef {
    /// The luma plane descriptor shared by every chroma format.
    pub const LUMA_PLANE: PlaneDef = PlaneDef {
        hsub: 1,
        vsub: 1,
        macropixel_size: 1,
        name: "y8",
    };
}
