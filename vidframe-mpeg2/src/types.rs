//! MPEG-2 header data types.

use std::fmt;
use vidframe_core::Rational;

/// Decoded sequence header (fixed part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Horizontal size, low 12 bits.
    pub horizontal: u16,
    /// Vertical size, low 12 bits.
    pub vertical: u16,
    /// Display aspect ratio information.
    pub aspect_ratio: AspectRatio,
    /// Frame rate code, resolved through [`frame_rate_from_code`].
    pub frame_rate_code: u8,
    /// Bit rate in units of 400 bit/s, low 18 bits.
    pub bit_rate: u32,
    /// VBV buffer size in units of 16 KiB, low 10 bits.
    pub vbv_buffer_size: u16,
}

/// Decoded sequence extension. Present after every sequence header of an
/// MPEG-2 stream; its absence implies MPEG-1-like defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceExtension {
    /// Profile and level indication.
    pub profile_and_level: u8,
    /// Progressive sequence flag.
    pub progressive_sequence: bool,
    /// Chroma format.
    pub chroma_format: ChromaFormat,
    /// Horizontal size, high 2 bits.
    pub horizontal_size_extension: u8,
    /// Vertical size, high 2 bits.
    pub vertical_size_extension: u8,
    /// Bit rate, high 12 bits.
    pub bit_rate_extension: u16,
    /// VBV buffer size, high 8 bits.
    pub vbv_buffer_size_extension: u8,
    /// Low delay flag.
    pub low_delay: bool,
    /// Frame rate extension numerator.
    pub frame_rate_extension_n: u8,
    /// Frame rate extension denominator.
    pub frame_rate_extension_d: u8,
}

impl SequenceExtension {
    /// Get the level indicated by the low nibble of profile_and_level.
    pub fn level(&self) -> Option<Level> {
        Level::from_code(self.profile_and_level & Level::MASK)
    }
}

/// Decoded sequence display extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDisplayExtension {
    /// Video format (component, PAL, NTSC, ...).
    pub video_format: u8,
    /// True when colour primaries/characteristics/matrix were present.
    pub colour_description: bool,
    /// Horizontal size of the display active region.
    pub display_horizontal: u16,
    /// Vertical size of the display active region.
    pub display_vertical: u16,
}

/// Decoded Group of Pictures header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopHeader {
    /// Drop frame flag of the time code.
    pub drop_frame: bool,
    /// Time code - hours.
    pub hours: u8,
    /// Time code - minutes.
    pub minutes: u8,
    /// Time code - seconds.
    pub seconds: u8,
    /// Time code - pictures.
    pub pictures: u8,
    /// Closed GOP flag.
    pub closed_gop: bool,
    /// Broken link flag.
    pub broken_link: bool,
}

/// Decoded picture header (fixed part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureHeader {
    /// Temporal reference (display order within the GOP).
    pub temporal_reference: u16,
    /// Picture coding type.
    pub coding_type: PictureCodingType,
    /// VBV delay in 90 kHz units; 0xFFFF when unspecified.
    pub vbv_delay: u16,
}

/// Decoded picture coding extension (fields the framer consumes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureCodingExtension {
    /// Intra DC precision; 0 means 8-bit.
    pub intra_dc_precision: u8,
    /// Picture structure.
    pub picture_structure: PictureStructure,
    /// Top field first.
    pub top_field_first: bool,
    /// Repeat first field.
    pub repeat_first_field: bool,
    /// Progressive frame.
    pub progressive_frame: bool,
}

/// Picture coding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PictureCodingType {
    /// I-picture (Intra).
    I = 1,
    /// P-picture (Predictive).
    P = 2,
    /// B-picture (Bidirectional).
    B = 3,
    /// D-picture (DC Intra - MPEG-1 only).
    D = 4,
}

impl PictureCodingType {
    /// Parse from code value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PictureCodingType::I),
            2 => Some(PictureCodingType::P),
            3 => Some(PictureCodingType::B),
            4 => Some(PictureCodingType::D),
            _ => None,
        }
    }

    /// Check if this is a reference picture.
    pub fn is_reference(&self) -> bool {
        matches!(self, PictureCodingType::I | PictureCodingType::P)
    }
}

impl fmt::Display for PictureCodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PictureCodingType::I => write!(f, "I"),
            PictureCodingType::P => write!(f, "P"),
            PictureCodingType::B => write!(f, "B"),
            PictureCodingType::D => write!(f, "D"),
        }
    }
}

/// Picture structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PictureStructure {
    /// Top field.
    TopField = 1,
    /// Bottom field.
    BottomField = 2,
    /// Frame.
    Frame = 3,
}

impl PictureStructure {
    /// Parse from code value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PictureStructure::TopField),
            2 => Some(PictureStructure::BottomField),
            3 => Some(PictureStructure::Frame),
            _ => None,
        }
    }

    /// Check if this is a field picture.
    pub fn is_field(&self) -> bool {
        !matches!(self, PictureStructure::Frame)
    }
}

/// Display aspect ratio information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AspectRatio {
    /// Square pixels.
    Square = 1,
    /// 4:3 display.
    Ratio4_3 = 2,
    /// 16:9 display.
    Ratio16_9 = 3,
    /// 2.21:1 display.
    Ratio221_1 = 4,
}

impl AspectRatio {
    /// Parse from code value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AspectRatio::Square),
            2 => Some(AspectRatio::Ratio4_3),
            3 => Some(AspectRatio::Ratio16_9),
            4 => Some(AspectRatio::Ratio221_1),
            _ => None,
        }
    }

    /// Display ratio factors `(k, m)`, such that the sample aspect ratio of
    /// a `h`x`v` picture is `(v * k) / (h * m)`.
    pub fn display_ratio(&self) -> (u64, u64) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Ratio4_3 => (4, 3),
            AspectRatio::Ratio16_9 => (16, 9),
            AspectRatio::Ratio221_1 => (221, 100),
        }
    }

    /// Sample aspect ratio for the given coded dimensions.
    pub fn sar(&self, horizontal: u32, vertical: u32) -> Rational {
        if matches!(self, AspectRatio::Square) {
            return Rational::new(1, 1);
        }
        let (k, m) = self.display_ratio();
        Rational::new(u64::from(vertical) * k, u64::from(horizontal) * m)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Square => write!(f, "1:1"),
            AspectRatio::Ratio4_3 => write!(f, "4:3"),
            AspectRatio::Ratio16_9 => write!(f, "16:9"),
            AspectRatio::Ratio221_1 => write!(f, "2.21:1"),
        }
    }
}

/// Chroma format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChromaFormat {
    /// 4:2:0 chroma subsampling.
    Yuv420 = 1,
    /// 4:2:2 chroma subsampling.
    Yuv422 = 2,
    /// 4:4:4 no chroma subsampling.
    Yuv444 = 3,
}

impl ChromaFormat {
    /// Parse from code value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ChromaFormat::Yuv420),
            2 => Some(ChromaFormat::Yuv422),
            3 => Some(ChromaFormat::Yuv444),
            _ => None,
        }
    }

    /// Chroma plane subsampling as `(hsub, vsub)`.
    pub fn subsampling(&self) -> (u8, u8) {
        match self {
            ChromaFormat::Yuv420 => (2, 2),
            ChromaFormat::Yuv422 => (2, 1),
            ChromaFormat::Yuv444 => (1, 1),
        }
    }
}

impl fmt::Display for ChromaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChromaFormat::Yuv420 => write!(f, "4:2:0"),
            ChromaFormat::Yuv422 => write!(f, "4:2:2"),
            ChromaFormat::Yuv444 => write!(f, "4:4:4"),
        }
    }
}

/// MPEG-2 level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Low Level.
    Low,
    /// Main Level.
    Main,
    /// High 1440 Level.
    High1440,
    /// High Level.
    High,
}

impl Level {
    /// Mask selecting the level bits of profile_and_level.
    pub const MASK: u8 = 0x0F;

    /// Parse from level code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            10 => Some(Level::Low),
            8 => Some(Level::Main),
            6 => Some(Level::High1440),
            4 => Some(Level::High),
            _ => None,
        }
    }

    /// Maximum stream rate for this level, in bytes per second.
    pub fn max_octetrate(&self) -> u64 {
        match self {
            Level::Low => 4_000_000 / 8,
            Level::Main => 15_000_000 / 8,
            Level::High1440 => 60_000_000 / 8,
            Level::High => 80_000_000 / 8,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "Low"),
            Level::Main => write!(f, "Main"),
            Level::High1440 => write!(f, "High-1440"),
            Level::High => write!(f, "High"),
        }
    }
}

/// Translate an MPEG frame_rate_code to a rational rate.
///
/// Codes 1 to 8 are the canonical ISO 13818-2 rates. Codes 9 to 13 are
/// nonstandard rates found in Xing and libmpeg3 streams and are accepted
/// for compatibility. Codes 0, 14 and 15 are invalid.
pub fn frame_rate_from_code(code: u8) -> Option<Rational> {
    match code {
        1 => Some(Rational::new(24000, 1001)),
        2 => Some(Rational::new(24, 1)),
        3 => Some(Rational::new(25, 1)),
        4 => Some(Rational::new(30000, 1001)),
        5 => Some(Rational::new(30, 1)),
        6 => Some(Rational::new(50, 1)),
        7 => Some(Rational::new(60000, 1001)),
        8 => Some(Rational::new(60, 1)),
        // Xing
        9 => Some(Rational::new(15000, 1001)),
        // libmpeg3
        10 => Some(Rational::new(5000, 1001)),
        11 => Some(Rational::new(10000, 1001)),
        12 => Some(Rational::new(12000, 1001)),
        13 => Some(Rational::new(15000, 1001)),
        _ => None,
    }
}
