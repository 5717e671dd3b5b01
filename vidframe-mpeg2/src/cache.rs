//! Cache of the last observed sequence header and extensions.
//!
//! The cache keeps the raw bytes of the latest sequence header, sequence
//! extension and sequence display extension. It detects unchanged sequences
//! by byte equality, so a stream that repeats its headers every GOP only
//! triggers one flow definition, and it supplies the blobs duplicated in
//! front of I pictures when sequence insertion is enabled.

use crate::flow::{FlowDef, PlaneDef};
use crate::headers::{
    decode_sequence_display_extension, decode_sequence_extension, decode_sequence_header,
};
use crate::types::{frame_rate_from_code, ChromaFormat};
use crate::{Mpeg2Error, Result, EXPECTED_FLOW_DEF};
use bytes::Bytes;
use vidframe_core::Rational;

/// Maximum stream rate assumed when no sequence extension advertises a
/// level, in bytes per second.
const DEFAULT_MAX_OCTETRATE: u64 = 1_500_000 / 8;

#[derive(Debug, Default)]
pub(crate) struct SequenceCache {
    header: Option<Bytes>,
    ext: Option<Bytes>,
    display: Option<Bytes>,
}

impl SequenceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a freshly observed header set. Returns true when all three
    /// blobs are byte-identical to the cached copies (treating absent on
    /// both sides as identical). The storage is rotated either way, so the
    /// cache never pins buffers of a long-gone input chunk.
    pub(crate) fn observe(
        &mut self,
        header: Bytes,
        ext: Option<Bytes>,
        display: Option<Bytes>,
    ) -> bool {
        let unchanged = self.header.as_ref() == Some(&header)
            && self.ext == ext
            && self.display == display;
        self.header = Some(header);
        self.ext = ext;
        self.display = display;
        unchanged
    }

    /// Drop the cached blobs, forcing the next observation to re-parse.
    pub(crate) fn clear(&mut self) {
        self.header = None;
        self.ext = None;
        self.display = None;
    }

    pub(crate) fn header(&self) -> Option<&Bytes> {
        self.header.as_ref()
    }

    pub(crate) fn ext(&self) -> Option<&Bytes> {
        self.ext.as_ref()
    }

    pub(crate) fn display(&self) -> Option<&Bytes> {
        self.display.as_ref()
    }

    /// Combine the cached blobs into a flow definition.
    ///
    /// Also returns the progressive_sequence flag, which the framer needs
    /// for duration derivation. When the sequence extension is absent the
    /// stream is treated as a progressive MPEG-1-like sequence.
    pub(crate) fn parse(&self) -> Result<(FlowDef, bool)> {
        let header = self.header.as_ref().ok_or(Mpeg2Error::NoSequence)?;
        let seq = decode_sequence_header(header)?;

        let mut fps = frame_rate_from_code(seq.frame_rate_code)
            .ok_or(Mpeg2Error::InvalidFrameRate(seq.frame_rate_code))?;
        if seq.frame_rate_code > 8 {
            tracing::warn!(
                "nonstandard frame rate code {} ({})",
                seq.frame_rate_code,
                fps
            );
        }

        let mut horizontal = u32::from(seq.horizontal);
        let mut vertical = u32::from(seq.vertical);
        let mut bitrate = u64::from(seq.bit_rate);
        let mut vbvbuffer = u64::from(seq.vbv_buffer_size);
        let mut max_octetrate = DEFAULT_MAX_OCTETRATE;
        let mut progressive = true;
        let mut chroma = ChromaFormat::Yuv420;
        let mut profile_level = None;
        let mut lowdelay = false;

        if let Some(ext_blob) = &self.ext {
            let ext = decode_sequence_extension(ext_blob)?;
            profile_level = Some(ext.profile_and_level);
            progressive = ext.progressive_sequence;
            chroma = ext.chroma_format;
            horizontal |= u32::from(ext.horizontal_size_extension) << 12;
            vertical |= u32::from(ext.vertical_size_extension) << 12;
            bitrate |= u64::from(ext.bit_rate_extension) << 18;
            vbvbuffer |= u64::from(ext.vbv_buffer_size_extension) << 10;
            lowdelay = ext.low_delay;
            fps = fps
                * Rational::new(
                    u64::from(ext.frame_rate_extension_n) + 1,
                    u64::from(ext.frame_rate_extension_d) + 1,
                );
            max_octetrate = ext
                .level()
                .ok_or(Mpeg2Error::UnsupportedLevel(
                    ext.profile_and_level & crate::types::Level::MASK,
                ))?
                .max_octetrate();
        }

        let sar = seq.aspect_ratio.sar(horizontal, vertical);

        let (hsub, vsub) = chroma.subsampling();
        let planes = vec![
            FlowDef::LUMA_PLANE,
            PlaneDef {
                hsub,
                vsub,
                macropixel_size: 1,
                name: "u8",
            },
            PlaneDef {
                hsub,
                vsub,
                macropixel_size: 1,
                name: "v8",
            },
        ];
        let suffix = match chroma {
            ChromaFormat::Yuv420 => "pic.planar8_8_420.",
            ChromaFormat::Yuv422 => "pic.planar8_8_422.",
            ChromaFormat::Yuv444 => "pic.planar8_8_444.",
        };

        let mut flow = FlowDef {
            def: format!("{EXPECTED_FLOW_DEF}{suffix}"),
            fps,
            max_octetrate,
            octetrate: bitrate * 400 / 8,
            cpb_buffer: vbvbuffer * 16 * 1024 / 8,
            hsize: horizontal,
            vsize: vertical,
            hsize_visible: None,
            vsize_visible: None,
            sar,
            profile_level,
            lowdelay,
            macropixel: 1,
            planes,
        };

        if let Some(display_blob) = &self.display {
            let display = decode_sequence_display_extension(display_blob)?;
            flow.hsize_visible = Some(u32::from(display.display_horizontal));
            flow.vsize_visible = Some(u32::from(display.display_vertical));
        }

        Ok((flow, progressive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQ: [u8; 12] = [
        0x00, 0x00, 0x01, 0xB3, 0x2D, 0x01, 0xE0, 0x24, 0x12, 0x4F, 0xA3, 0x80,
    ];
    const SEQX: [u8; 10] = [
        0x00, 0x00, 0x01, 0xB5, 0x14, 0x8A, 0x00, 0x01, 0x00, 0x00,
    ];
    const SEQDX: [u8; 9] = [0x00, 0x00, 0x01, 0xB5, 0x20, 0x0B, 0x02, 0x0F, 0x00];

    fn seq() -> Bytes {
        Bytes::copy_from_slice(&SEQ)
    }

    fn seqx() -> Bytes {
        Bytes::copy_from_slice(&SEQX)
    }

    #[test]
    fn test_observe_detects_unchanged() {
        let mut cache = SequenceCache::new();
        assert!(!cache.observe(seq(), Some(seqx()), None));
        assert!(cache.observe(seq(), Some(seqx()), None));
        // Dropping the extension is a change.
        assert!(!cache.observe(seq(), None, None));
        assert!(cache.observe(seq(), None, None));
    }

    #[test]
    fn test_observe_detects_content_change() {
        let mut cache = SequenceCache::new();
        cache.observe(seq(), None, None);
        let mut other = SEQ;
        other[4] = 0x2C;
        assert!(!cache.observe(Bytes::copy_from_slice(&other), None, None));
    }

    #[test]
    fn test_parse_full_sequence() {
        let mut cache = SequenceCache::new();
        cache.observe(seq(), Some(seqx()), Some(Bytes::copy_from_slice(&SEQDX)));
        let (flow, progressive) = cache.parse().unwrap();
        assert!(progressive);
        assert_eq!(flow.def, "block.mpeg2video.pic.planar8_8_420.");
        assert_eq!(flow.fps, Rational::new(30000, 1001));
        assert_eq!(flow.hsize, 720);
        assert_eq!(flow.vsize, 480);
        assert_eq!(flow.hsize_visible, Some(704));
        assert_eq!(flow.vsize_visible, Some(480));
        assert_eq!(flow.sar, Rational::new(8, 9));
        assert_eq!(flow.max_octetrate, 1_875_000);
        assert_eq!(flow.octetrate, 18750 * 400 / 8);
        assert_eq!(flow.cpb_buffer, 112 * 16 * 1024 / 8);
        assert_eq!(flow.profile_level, Some(0x48));
        assert!(!flow.lowdelay);
        assert_eq!(flow.macropixel, 1);
        assert_eq!(flow.planes.len(), 3);
        assert_eq!(flow.planes[1].hsub, 2);
        assert_eq!(flow.planes[1].vsub, 2);
    }

    #[test]
    fn test_parse_without_extension_defaults() {
        let mut cache = SequenceCache::new();
        cache.observe(seq(), None, None);
        let (flow, progressive) = cache.parse().unwrap();
        assert!(progressive);
        assert_eq!(flow.max_octetrate, DEFAULT_MAX_OCTETRATE);
        assert_eq!(flow.profile_level, None);
        assert_eq!(flow.def, "block.mpeg2video.pic.planar8_8_420.");
    }

    #[test]
    fn test_parse_rejects_bad_frame_rate() {
        // frame_rate_code 0
        let mut bad = SEQ;
        bad[7] = 0x20;
        let mut cache = SequenceCache::new();
        cache.observe(Bytes::copy_from_slice(&bad), None, None);
        assert!(matches!(
            cache.parse(),
            Err(Mpeg2Error::InvalidFrameRate(0))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_level() {
        // level nibble 0b0001 is reserved
        let mut bad_ext = SEQX;
        bad_ext[5] = 0x1A;
        let mut cache = SequenceCache::new();
        cache.observe(seq(), Some(Bytes::copy_from_slice(&bad_ext)), None);
        assert!(matches!(
            cache.parse(),
            Err(Mpeg2Error::UnsupportedLevel(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut cache = SequenceCache::new();
        cache.observe(seq(), None, None);
        cache.clear();
        assert!(cache.header().is_none());
        assert!(matches!(cache.parse(), Err(Mpeg2Error::NoSequence)));
    }
}
