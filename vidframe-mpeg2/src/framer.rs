//! The MPEG-2 elementary-stream framer.
//!
//! The framer walks the buffered stream one start code at a time. Before a
//! sequence header has ever been seen it discards bytes while keeping only
//! the rolling scan window. Once acquired, it records the offsets of the
//! structural headers of the frame under construction; the first start code
//! after the picture data (sequence, GOP, picture or sequence end) closes
//! the frame, which is then extracted, decoded and pushed to the sink.

use crate::cache::SequenceCache;
use crate::flow::FlowDef;
use crate::headers::{
    decode_gop_header, decode_picture_coding_extension, decode_picture_header,
};
use crate::scan::{scan, start_code, SCAN_CONTEXT_IDLE};
use crate::types::{PictureCodingType, PictureStructure};
use crate::{
    Mpeg2Error, Result, EXPECTED_FLOW_DEF, EXTENSION_START_CODE, GOP_HEADER_SIZE, GOP_START_CODE,
    MAX_FRAME_SIZE, PICTURE_CODING_EXTENSION_ID, PICTURE_EXTENSION_SIZE, PICTURE_HEADER_SIZE,
    PICTURE_START_CODE, QUANT_MATRIX_SIZE, SEQUENCE_DISPLAY_COLOR_SIZE,
    SEQUENCE_DISPLAY_EXTENSION_ID, SEQUENCE_DISPLAY_SIZE, SEQUENCE_END_CODE,
    SEQUENCE_EXTENSION_ID, SEQUENCE_EXTENSION_SIZE, SEQUENCE_HEADER_CODE, SEQUENCE_HEADER_SIZE,
    SLICE_START_CODE_MAX, SLICE_START_CODE_MIN, USER_DATA_START_CODE,
};
use bitflags::bitflags;
use bytes::Bytes;
use std::fmt;
use vidframe_core::{
    BufferStream, ByteChunk, ChunkFlags, ChunkMeta, ClockTime, ClockTimes, Rational, UCLOCK_FREQ,
};

bitflags! {
    /// Flags of a framed picture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PictureFlags: u32 {
        /// The picture contains a top field.
        const TOP_FIELD = 0x0001;
        /// The picture contains a bottom field.
        const BOTTOM_FIELD = 0x0002;
        /// The top field is output first.
        const TOP_FIELD_FIRST = 0x0004;
        /// The picture is progressive.
        const PROGRESSIVE = 0x0008;
        /// The picture can serve as a stream entry point.
        const RANDOM = 0x0010;
        /// The picture follows a reference break (broken link or open GOP
        /// after a carrier discontinuity).
        const DISCONTINUITY = 0x0020;
        /// The picture data may be corrupted.
        const ERROR = 0x0040;
    }
}

/// One framed coded picture, with its prefixed headers and decoded
/// metadata.
#[derive(Clone)]
pub struct FramedPicture {
    /// Picture bytes as a chain of zero-copy slices of the input chunks.
    pub(crate) segments: Vec<Bytes>,
    /// Timestamp channels frozen at the picture start code.
    pub times: ClockTimes,
    /// System time of the random access point this picture depends on.
    pub systime_rap: ClockTime,
    /// Picture duration in 27 MHz ticks.
    pub duration: u64,
    /// VBV delay in 27 MHz ticks, when the stream specifies one.
    pub vbv_delay: Option<u64>,
    /// Picture number, increasing in coded order across GOPs.
    pub picture_number: u64,
    /// Picture coding type.
    pub picture_type: PictureCodingType,
    /// Temporal reference within the GOP.
    pub temporal_reference: u16,
    /// Size of the sequence/GOP headers preceding the picture header, when
    /// any.
    pub header_size: Option<usize>,
    /// Picture flags.
    pub flags: PictureFlags,
}

impl FramedPicture {
    fn new(segments: Vec<Bytes>, meta: ChunkMeta) -> Self {
        let mut flags = PictureFlags::empty();
        if meta.flags.contains(ChunkFlags::ERROR) {
            flags |= PictureFlags::ERROR;
        }
        Self {
            segments,
            times: ClockTimes::UNSET,
            systime_rap: meta.systime_rap,
            duration: 0,
            vbv_delay: None,
            picture_number: 0,
            picture_type: PictureCodingType::I,
            temporal_reference: 0,
            header_size: None,
            flags,
        }
    }

    /// Picture bytes as a chain of zero-copy segments.
    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    /// Total picture size in bytes.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    /// Check whether the picture carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the picture bytes into one contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }
}

impl fmt::Debug for FramedPicture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedPicture")
            .field("len", &self.len())
            .field("picture_type", &self.picture_type)
            .field("picture_number", &self.picture_number)
            .field("duration", &self.duration)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Events raised by the framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerEvent {
    /// A sequence header was found; the framer is synchronized.
    SyncAcquired,
    /// Synchronization was lost (resync, end code or discontinuity).
    SyncLost,
    /// An unrecoverable internal failure; the framer is dead.
    Fatal,
}

/// Downstream sink receiving the framer output.
///
/// Emission is a direct synchronous call; the sink must not feed data back
/// into the framer during the call.
pub trait FrameSink {
    /// A new or changed flow definition, sent before the first frame it
    /// applies to.
    fn flow_def(&mut self, def: &FlowDef) {
        let _ = def;
    }

    /// One framed picture.
    fn frame(&mut self, frame: FramedPicture);

    /// A metadata-only input marker, forwarded unchanged.
    fn passthrough(&mut self, chunk: ByteChunk) {
        let _ = chunk;
    }

    /// A framer event.
    fn event(&mut self, event: FramerEvent) {
        let _ = event;
    }
}

/// State of the frame under construction. All offsets are relative to the
/// first byte of the frame.
#[derive(Debug, Default)]
struct FrameBuild {
    /// The frame begins with a sequence header.
    sequence: bool,
    sequence_ext_offset: Option<usize>,
    sequence_display_offset: Option<usize>,
    gop_offset: Option<usize>,
    picture_offset: Option<usize>,
    picture_ext_offset: Option<usize>,
    /// At least one slice start code seen after the picture header.
    slice_seen: bool,
}

/// A start code returned by the scanner, with the extension identifier
/// carried by the following byte when the code is the extension start code.
#[derive(Debug, Clone, Copy)]
struct StartCode {
    value: u8,
    ext_id: Option<u8>,
}

/// Framer for ISO/IEC 13818-2 video elementary streams.
pub struct Mpeg2Framer {
    stream: BufferStream,
    scan_context: u32,
    /// Bytes of the frame under construction scanned so far.
    next_frame_size: usize,
    /// A sequence header has been seen; the stream is synchronized.
    acquired: bool,
    build: FrameBuild,
    cache: SequenceCache,
    flow_def: Option<FlowDef>,
    flow_def_sent: bool,
    /// The cached sequence parsed into a usable flow definition.
    sequence_valid: bool,
    progressive_sequence: bool,
    fps: Rational,
    closed_gop: bool,
    got_discontinuity: bool,
    insert_sequence: bool,
    last_picture_number: i64,
    last_temporal_reference: i64,
    systime_rap: ClockTime,
    systime_rap_ref: ClockTime,
    output: Option<Box<dyn FrameSink>>,
    dead: bool,
}

impl Mpeg2Framer {
    /// Create a framer for the given input flow definition.
    ///
    /// The flow definition must begin with [`EXPECTED_FLOW_DEF`].
    pub fn new(flow_def: &str) -> Result<Self> {
        if !flow_def.starts_with(EXPECTED_FLOW_DEF) {
            return Err(Mpeg2Error::InvalidFlowDef(flow_def.to_string()));
        }
        tracing::debug!("mpgv framer ready");
        Ok(Self {
            stream: BufferStream::new(),
            scan_context: SCAN_CONTEXT_IDLE,
            next_frame_size: 0,
            acquired: false,
            build: FrameBuild::default(),
            cache: SequenceCache::new(),
            flow_def: None,
            flow_def_sent: false,
            sequence_valid: false,
            progressive_sequence: true,
            fps: Rational::new(25, 1),
            closed_gop: false,
            got_discontinuity: false,
            insert_sequence: false,
            last_picture_number: -1,
            last_temporal_reference: -1,
            systime_rap: ClockTime::UNSET,
            systime_rap_ref: ClockTime::UNSET,
            output: None,
            dead: false,
        })
    }

    /// Current output flow definition; absent until the first sequence
    /// header parses successfully.
    pub fn flow_def(&self) -> Option<&FlowDef> {
        self.flow_def.as_ref()
    }

    /// Downstream sink, if bound.
    pub fn output(&self) -> Option<&dyn FrameSink> {
        self.output.as_deref()
    }

    /// Bind the downstream sink. A pending flow definition is re-sent
    /// before the next frame.
    pub fn set_output(&mut self, sink: Box<dyn FrameSink>) {
        self.output = Some(sink);
        self.flow_def_sent = false;
    }

    /// Current setting for sequence header insertion.
    pub fn sequence_insertion(&self) -> bool {
        self.insert_sequence
    }

    /// Enable or disable sequence header insertion. When enabled, the
    /// cached sequence headers are duplicated in front of every I picture
    /// that lacks them, so each I picture is a stream entry point.
    pub fn set_sequence_insertion(&mut self, insert: bool) {
        self.insert_sequence = insert;
    }

    /// Feed one chunk and run the framer until the buffered bytes are
    /// exhausted. Frames are pushed synchronously to the bound sink.
    pub fn input(&mut self, chunk: ByteChunk) {
        if self.dead {
            tracing::debug!("dropping input on dead framer");
            return;
        }

        if chunk.is_empty() {
            // Metadata-only marker, passed through unchanged.
            if let Some(sink) = self.output.as_mut() {
                sink.passthrough(chunk);
            }
            return;
        }

        if chunk.flags.contains(ChunkFlags::DISCONTINUITY) {
            if !self.build.slice_seen {
                // A discontinuity in the headers before the first slice
                // cannot be repaired; inside the slices it is less
                // destructive.
                self.stream.reset();
                self.got_discontinuity = true;
                self.next_frame_size = 0;
                self.scan_context = SCAN_CONTEXT_IDLE;
                self.sync_lost();
                self.build = FrameBuild::default();
            } else {
                self.stream.mark_head_error();
            }
        }

        self.stream.push(chunk);
        self.work();
    }

    /// Process buffered bytes, emitting every complete frame.
    fn work(&mut self) {
        while !self.stream.is_empty() {
            let code = match self.find() {
                Ok(Some(code)) => code,
                Ok(None) => return,
                Err(err) => {
                    tracing::warn!("malformed stream: {err}");
                    self.stream.reset();
                    self.next_frame_size = 0;
                    self.scan_context = SCAN_CONTEXT_IDLE;
                    self.sync_lost();
                    self.build = FrameBuild::default();
                    return;
                }
            };

            if !self.acquired {
                // Keep only the start code itself; everything before it is
                // inter-sequence garbage.
                let discard = self.next_frame_size - 4;
                if discard > 0 && self.stream.consume(discard).is_err() {
                    self.fatal();
                    return;
                }
                self.next_frame_size = 4;

                match code.value {
                    PICTURE_START_CODE => {
                        // Those timestamps were for data we do not output.
                        self.stream.flush_pts();
                        self.stream.flush_dts();
                    }
                    SEQUENCE_HEADER_CODE => {
                        self.sync_acquired();
                        self.build.sequence = true;
                    }
                    _ => {}
                }
                continue;
            }

            if self.build.picture_offset.is_none() {
                let offset = self.next_frame_size - 4;
                match (code.value, code.ext_id) {
                    (EXTENSION_START_CODE, Some(SEQUENCE_EXTENSION_ID)) => {
                        self.build.sequence_ext_offset = Some(offset);
                    }
                    (EXTENSION_START_CODE, Some(SEQUENCE_DISPLAY_EXTENSION_ID)) => {
                        self.build.sequence_display_offset = Some(offset);
                    }
                    (GOP_START_CODE, _) => self.build.gop_offset = Some(offset),
                    (PICTURE_START_CODE, _) => self.build.picture_offset = Some(offset),
                    _ => {}
                }
                continue;
            }

            match code.value {
                EXTENSION_START_CODE => {
                    if code.ext_id == Some(PICTURE_CODING_EXTENSION_ID) {
                        self.build.picture_ext_offset = Some(self.next_frame_size - 4);
                    }
                    continue;
                }
                USER_DATA_START_CODE => continue,
                value if (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX).contains(&value) => {
                    self.build.slice_seen = true;
                    continue;
                }
                _ => {}
            }

            // Frame boundary. The start code just seen opens the next
            // frame, except the sequence end code which closes this one.
            if code.value != SEQUENCE_END_CODE {
                self.next_frame_size -= 4;
            }

            match self.output_frame() {
                Ok(()) => {}
                Err(Mpeg2Error::Stream(err)) => {
                    tracing::error!("buffer failure: {err}");
                    self.fatal();
                    return;
                }
                Err(err) => {
                    tracing::warn!("erroneous frame headers: {err}");
                    self.next_frame_size = 0;
                    self.scan_context = SCAN_CONTEXT_IDLE;
                    self.sync_lost();
                    self.build = FrameBuild::default();
                    continue;
                }
            }

            self.build = FrameBuild::default();
            self.next_frame_size = 4;
            match code.value {
                SEQUENCE_HEADER_CODE => self.build.sequence = true,
                GOP_START_CODE => self.build.gop_offset = Some(0),
                PICTURE_START_CODE => self.build.picture_offset = Some(0),
                SEQUENCE_END_CODE => {
                    self.next_frame_size = 0;
                    self.sync_lost();
                }
                value => {
                    tracing::warn!("erroneous start code {value:#04x}");
                    self.sync_lost();
                }
            }
        }
    }

    /// Advance the scan to the next start code.
    ///
    /// Returns `Ok(None)` when the buffered bytes are exhausted before a
    /// code completes. When the extension start code ends exactly at the
    /// buffered bytes, the scan is backed out so that the next input
    /// re-finds the code once the extension identifier is available.
    fn find(&mut self) -> Result<Option<StartCode>> {
        loop {
            let (matched, span_len) = match self.stream.read_span(self.next_frame_size) {
                Some(span) => (scan(span, &mut self.scan_context), span.len()),
                None => return Ok(None),
            };
            match matched {
                Some(end) => {
                    self.next_frame_size += end;
                    let value = start_code(self.scan_context);
                    if value != EXTENSION_START_CODE {
                        return Ok(Some(StartCode { value, ext_id: None }));
                    }
                    match self.stream.peek_byte(self.next_frame_size) {
                        Some(byte) => {
                            return Ok(Some(StartCode {
                                value,
                                ext_id: Some(byte >> 4),
                            }))
                        }
                        None => {
                            self.scan_context = SCAN_CONTEXT_IDLE;
                            self.next_frame_size -= 4;
                            return Ok(None);
                        }
                    }
                }
                None => {
                    self.next_frame_size += span_len;
                    if self.next_frame_size > MAX_FRAME_SIZE {
                        return Err(Mpeg2Error::FrameTooLarge {
                            max: MAX_FRAME_SIZE,
                        });
                    }
                }
            }
        }
    }

    /// Extract, decode and emit the frame under construction.
    fn output_frame(&mut self) -> Result<()> {
        let picture_offset = self.build.picture_offset.unwrap_or(0);

        // The PTS can be declared up to the first byte of the picture start
        // code, so the preceding headers are extracted first: extraction
        // promotes the chunks that may carry that declaration.
        let mut segments = Vec::new();
        let mut meta = None;
        if picture_offset > 0 {
            let (prefix, prefix_meta) = self.stream.extract(picture_offset)?;
            segments = prefix;
            meta = Some(prefix_meta);
        }

        // From now on, timestamp declarations impact the next frame only.
        let times = self.stream.take_times();

        let (payload, payload_meta) = self
            .stream
            .extract(self.next_frame_size - picture_offset)?;
        let meta = meta.unwrap_or(payload_meta);
        segments.extend(payload);

        if self.build.sequence {
            self.handle_sequence(&segments)?;
        }
        if !self.sequence_valid {
            tracing::debug!("dropping frame of an unsupported sequence");
            return Ok(());
        }

        let mut frame = FramedPicture::new(segments, meta);
        self.handle_picture(&mut frame, picture_offset)?;
        frame.times = times;

        self.stream.backfill_dts(&times, frame.duration);
        self.deliver(frame);
        Ok(())
    }

    /// Cache the sequence headers of the frame and refresh the flow
    /// definition when they changed.
    fn handle_sequence(&mut self, segments: &[Bytes]) -> Result<()> {
        // The two low bits of byte 11 signal the optional quantiser
        // matrices.
        let mut header_size = SEQUENCE_HEADER_SIZE;
        let mut matrix_flags = frame_region(segments, 11, 1)?[0];
        if matrix_flags & 0x2 != 0 {
            header_size += QUANT_MATRIX_SIZE;
            matrix_flags = frame_region(segments, 11 + QUANT_MATRIX_SIZE, 1)?[0];
        }
        if matrix_flags & 0x1 != 0 {
            header_size += QUANT_MATRIX_SIZE;
        }
        let header = frame_region(segments, 0, header_size)?;

        let ext = match self.build.sequence_ext_offset {
            Some(offset) => Some(frame_region(segments, offset, SEQUENCE_EXTENSION_SIZE)?),
            None => None,
        };
        let display = if ext.is_some() {
            match self.build.sequence_display_offset {
                Some(offset) => {
                    let colour = frame_region(segments, offset + 4, 1)?[0];
                    let size = SEQUENCE_DISPLAY_SIZE
                        + if colour & 0x1 != 0 {
                            SEQUENCE_DISPLAY_COLOR_SIZE
                        } else {
                            0
                        };
                    Some(frame_region(segments, offset, size)?)
                }
                None => None,
            }
        } else {
            None
        };

        if self.cache.observe(header, ext, display) {
            // Identical sequence; the flow definition is already current.
            return Ok(());
        }

        match self.cache.parse() {
            Ok((flow, progressive)) => {
                self.progressive_sequence = progressive;
                self.fps = flow.fps;
                self.flow_def = Some(flow);
                self.flow_def_sent = false;
                self.sequence_valid = true;
                Ok(())
            }
            Err(err) if err.is_invalid_stream() => {
                // Well-framed but using codes we cannot honor. Frames are
                // dropped until a different sequence header shows up.
                tracing::warn!("unsupported sequence: {err}");
                self.cache.clear();
                self.sequence_valid = false;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Decode the GOP and picture headers and fill the picture metadata.
    fn handle_picture(&mut self, frame: &mut FramedPicture, picture_offset: usize) -> Result<()> {
        self.closed_gop = false;
        let mut broken_link = false;
        if let Some(gop_offset) = self.build.gop_offset {
            let gop =
                decode_gop_header(&frame_region(&frame.segments, gop_offset, GOP_HEADER_SIZE)?)?;
            self.closed_gop = gop.closed_gop;
            broken_link = gop.broken_link;
            self.last_temporal_reference = -1;
            if gop_offset > 0 {
                frame.header_size = Some(gop_offset);
            }
        } else if picture_offset > 0 {
            frame.header_size = Some(picture_offset);
        }

        if broken_link || (!self.closed_gop && self.got_discontinuity) {
            frame.flags |= PictureFlags::DISCONTINUITY;
        }

        let pic = decode_picture_header(&frame_region(
            &frame.segments,
            picture_offset,
            PICTURE_HEADER_SIZE,
        )?)?;

        let temporal_reference = i64::from(pic.temporal_reference);
        let picture_number =
            self.last_picture_number + (temporal_reference - self.last_temporal_reference);
        if temporal_reference > self.last_temporal_reference {
            self.last_temporal_reference = temporal_reference;
            self.last_picture_number = picture_number;
        }
        frame.picture_number = picture_number as u64;
        frame.picture_type = pic.coding_type;
        frame.temporal_reference = pic.temporal_reference;
        if pic.vbv_delay != 0xFFFF {
            frame.vbv_delay = Some(u64::from(pic.vbv_delay) * UCLOCK_FREQ / 90_000);
        }

        let mut duration = UCLOCK_FREQ * self.fps.den / self.fps.num;
        if let Some(ext_offset) = self.build.picture_ext_offset {
            let ext = decode_picture_coding_extension(&frame_region(
                &frame.segments,
                ext_offset,
                PICTURE_EXTENSION_SIZE,
            )?)?;

            if ext.intra_dc_precision != 0 {
                tracing::warn!(
                    "bit depth {} is possibly not supported",
                    ext.intra_dc_precision + 8
                );
            }

            if self.progressive_sequence {
                if ext.repeat_first_field {
                    duration *= 1 + u64::from(ext.top_field_first);
                }
            } else if ext.picture_structure == PictureStructure::Frame {
                if ext.repeat_first_field {
                    duration += duration / 2;
                }
            } else {
                duration /= 2;
            }

            match ext.picture_structure {
                PictureStructure::TopField => frame.flags |= PictureFlags::TOP_FIELD,
                PictureStructure::BottomField => frame.flags |= PictureFlags::BOTTOM_FIELD,
                PictureStructure::Frame => {
                    frame.flags |= PictureFlags::TOP_FIELD | PictureFlags::BOTTOM_FIELD;
                }
            }
            if ext.top_field_first {
                frame.flags |= PictureFlags::TOP_FIELD_FIRST;
            }
            if ext.progressive_frame {
                frame.flags |= PictureFlags::PROGRESSIVE;
            }
        } else {
            frame.flags |=
                PictureFlags::TOP_FIELD | PictureFlags::BOTTOM_FIELD | PictureFlags::PROGRESSIVE;
        }
        frame.duration = duration;

        match pic.coding_type {
            PictureCodingType::I => {
                if self.build.sequence {
                    frame.flags |= PictureFlags::RANDOM;
                } else if self.insert_sequence {
                    if let Some(header) = self.cache.header() {
                        if let Some(display) = self.cache.display() {
                            frame.segments.insert(0, display.clone());
                        }
                        if let Some(ext) = self.cache.ext() {
                            frame.segments.insert(0, ext.clone());
                        }
                        frame.segments.insert(0, header.clone());
                        frame.flags |= PictureFlags::RANDOM;
                    }
                }
                let ingress_rap = frame.systime_rap;
                self.systime_rap_ref = self.systime_rap;
                self.systime_rap = ingress_rap;
            }
            PictureCodingType::P => {
                self.systime_rap_ref = self.systime_rap;
                if self.systime_rap.is_set() {
                    frame.systime_rap = self.systime_rap;
                }
            }
            PictureCodingType::B => {
                if self.systime_rap_ref.is_set() {
                    frame.systime_rap = self.systime_rap_ref;
                }
            }
            PictureCodingType::D => {}
        }

        if self.closed_gop {
            self.systime_rap_ref = self.systime_rap;
        }

        Ok(())
    }

    fn deliver(&mut self, frame: FramedPicture) {
        let Some(sink) = self.output.as_mut() else {
            tracing::warn!("no output configured, dropping frame");
            return;
        };
        if !self.flow_def_sent {
            if let Some(def) = self.flow_def.as_ref() {
                sink.flow_def(def);
                self.flow_def_sent = true;
            }
        }
        sink.frame(frame);
    }

    fn event(&mut self, event: FramerEvent) {
        if let Some(sink) = self.output.as_mut() {
            sink.event(event);
        }
    }

    fn sync_acquired(&mut self) {
        if !self.acquired {
            tracing::debug!("sync acquired");
            self.acquired = true;
            self.event(FramerEvent::SyncAcquired);
        }
    }

    fn sync_lost(&mut self) {
        if self.acquired {
            tracing::debug!("sync lost");
            self.acquired = false;
            self.event(FramerEvent::SyncLost);
        }
    }

    fn fatal(&mut self) {
        tracing::error!("fatal buffer failure, framer is dead");
        self.dead = true;
        self.stream.reset();
        self.event(FramerEvent::Fatal);
    }
}

impl fmt::Debug for Mpeg2Framer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mpeg2Framer")
            .field("acquired", &self.acquired)
            .field("next_frame_size", &self.next_frame_size)
            .field("buffered", &self.stream.available())
            .field("insert_sequence", &self.insert_sequence)
            .field("dead", &self.dead)
            .finish_non_exhaustive()
    }
}

impl Drop for Mpeg2Framer {
    fn drop(&mut self) {
        tracing::debug!("mpgv framer dead");
    }
}

/// Copy-free access to `len` bytes at `offset` within a segment chain.
/// Falls back to a copy when the region crosses a segment boundary.
fn frame_region(segments: &[Bytes], offset: usize, len: usize) -> Result<Bytes> {
    let total: usize = segments.iter().map(Bytes::len).sum();
    if offset + len > total {
        return Err(Mpeg2Error::InsufficientData {
            needed: offset + len,
            available: total,
        });
    }

    let mut off = offset;
    for segment in segments {
        if off < segment.len() {
            if off + len <= segment.len() {
                return Ok(segment.slice(off..off + len));
            }
            break;
        }
        off -= segment.len();
    }

    let mut out = Vec::with_capacity(len);
    let mut off = offset;
    for segment in segments {
        if off >= segment.len() {
            off -= segment.len();
            continue;
        }
        let take = (segment.len() - off).min(len - out.len());
        out.extend_from_slice(&segment[off..off + take]);
        off = 0;
        if out.len() == len {
            break;
        }
    }
    Ok(Bytes::from(out))
}
