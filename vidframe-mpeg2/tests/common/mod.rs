//! Shared helpers for the framer integration tests: bit-exact header
//! builders and a collecting sink.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use vidframe_core::ByteChunk;
use vidframe_mpeg2::{
    FlowDef, FrameSink, FramedPicture, FramerEvent, Mpeg2Framer, EXPECTED_FLOW_DEF,
};

/// I picture coding type.
pub const TYPE_I: u8 = 1;
/// P picture coding type.
pub const TYPE_P: u8 = 2;
/// B picture coding type.
pub const TYPE_B: u8 = 3;

/// Big-endian bit packer. The last byte is zero-padded.
pub struct BitWriter {
    bytes: Vec<u8>,
    bit: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit: 0,
        }
    }

    pub fn put(&mut self, value: u32, bits: u8) {
        for i in (0..bits).rev() {
            if self.bit == 0 {
                self.bytes.push(0);
            }
            let b = ((value >> i) & 1) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= b << (7 - self.bit);
            self.bit = (self.bit + 1) % 8;
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn start_code(code: u8) -> Vec<u8> {
    vec![0x00, 0x00, 0x01, code]
}

/// Sequence header: 12 bytes, no quantiser matrices.
pub fn sequence_header(h: u16, v: u16, aspect: u8, framerate: u8, bitrate: u32, vbv: u16) -> Vec<u8> {
    let mut out = start_code(0xB3);
    let mut w = BitWriter::new();
    w.put(u32::from(h), 12);
    w.put(u32::from(v), 12);
    w.put(u32::from(aspect), 4);
    w.put(u32::from(framerate), 4);
    w.put(bitrate, 18);
    w.put(1, 1); // marker
    w.put(u32::from(vbv), 10);
    w.put(0, 1); // constrained_parameters_flag
    w.put(0, 1); // load_intra_quantizer_matrix
    w.put(0, 1); // load_non_intra_quantizer_matrix
    out.extend(w.finish());
    out
}

/// Sequence extension: 10 bytes, no size/rate extensions.
pub fn sequence_extension(
    profile_level: u8,
    progressive: bool,
    chroma: u8,
    fr_ext_n: u8,
    fr_ext_d: u8,
) -> Vec<u8> {
    let mut out = start_code(0xB5);
    let mut w = BitWriter::new();
    w.put(0x1, 4); // sequence extension id
    w.put(u32::from(profile_level), 8);
    w.put(u32::from(progressive), 1);
    w.put(u32::from(chroma), 2);
    w.put(0, 2); // horizontal_size_extension
    w.put(0, 2); // vertical_size_extension
    w.put(0, 12); // bit_rate_extension
    w.put(1, 1); // marker
    w.put(0, 8); // vbv_buffer_size_extension
    w.put(0, 1); // low_delay
    w.put(u32::from(fr_ext_n), 2);
    w.put(u32::from(fr_ext_d), 5);
    out.extend(w.finish());
    out
}

/// Sequence display extension: 9 bytes, no colour description.
pub fn sequence_display(h: u16, v: u16) -> Vec<u8> {
    let mut out = start_code(0xB5);
    let mut w = BitWriter::new();
    w.put(0x2, 4); // sequence display extension id
    w.put(0, 3); // video_format
    w.put(0, 1); // colour_description
    w.put(u32::from(h), 14);
    w.put(1, 1); // marker
    w.put(u32::from(v), 14);
    out.extend(w.finish());
    out
}

/// GOP header: 8 bytes, zero time code.
pub fn gop_header(closed: bool, broken: bool) -> Vec<u8> {
    let mut out = start_code(0xB8);
    let mut w = BitWriter::new();
    w.put(0, 1); // drop_frame_flag
    w.put(0, 5); // hours
    w.put(0, 6); // minutes
    w.put(1, 1); // marker
    w.put(0, 6); // seconds
    w.put(0, 6); // pictures
    w.put(u32::from(closed), 1);
    w.put(u32::from(broken), 1);
    out.extend(w.finish());
    out
}

/// Picture header, with the P/B motion fields where required.
pub fn picture_header(tref: u16, coding_type: u8, vbv_delay: u16) -> Vec<u8> {
    let mut out = start_code(0x00);
    let mut w = BitWriter::new();
    w.put(u32::from(tref), 10);
    w.put(u32::from(coding_type), 3);
    w.put(u32::from(vbv_delay), 16);
    if coding_type == TYPE_P || coding_type == TYPE_B {
        w.put(0, 1); // full_pel_forward_vector
        w.put(7, 3); // forward_f_code
    }
    if coding_type == TYPE_B {
        w.put(0, 1); // full_pel_backward_vector
        w.put(7, 3); // backward_f_code
    }
    out.extend(w.finish());
    out
}

/// Picture coding extension: 9 bytes.
pub fn picture_coding_extension(
    intra_dc: u8,
    structure: u8,
    tff: bool,
    rff: bool,
    progressive_frame: bool,
) -> Vec<u8> {
    let mut out = start_code(0xB5);
    let mut w = BitWriter::new();
    w.put(0x8, 4); // picture coding extension id
    w.put(0xFFFF, 16); // f_codes
    w.put(u32::from(intra_dc), 2);
    w.put(u32::from(structure), 2);
    w.put(u32::from(tff), 1);
    w.put(1, 1); // frame_pred_frame_dct
    w.put(0, 1); // concealment_motion_vectors
    w.put(0, 1); // q_scale_type
    w.put(0, 1); // intra_vlc_format
    w.put(0, 1); // alternate_scan
    w.put(u32::from(rff), 1);
    w.put(0, 1); // chroma_420_type
    w.put(u32::from(progressive_frame), 1);
    w.put(0, 1); // composite_display_flag
    out.extend(w.finish());
    out
}

/// A slice with a tiny opaque payload.
pub fn slice(id: u8) -> Vec<u8> {
    let mut out = start_code(id);
    out.extend([0x1A, 0x2B, 0x3C]);
    out
}

pub fn end_code() -> Vec<u8> {
    start_code(0xB7)
}

/// The default sequence of the tests: 720x480, 4:3, 29.97 fps, Main@Main,
/// 4:2:0.
pub fn default_sequence() -> Vec<u8> {
    let mut out = sequence_header(720, 480, 2, 4, 18750, 112);
    out.extend(sequence_extension(0x48, true, 1, 0, 0));
    out
}

/// One coded picture: header, coding extension, one slice.
pub fn frame_picture(tref: u16, coding_type: u8) -> Vec<u8> {
    let mut out = picture_header(tref, coding_type, 0xFFFF);
    out.extend(picture_coding_extension(0, 3, true, false, true));
    out.extend(slice(0x01));
    out
}

/// Everything the sink saw.
#[derive(Default)]
pub struct Captured {
    pub frames: Vec<FramedPicture>,
    pub flow_defs: Vec<FlowDef>,
    pub events: Vec<FramerEvent>,
    pub markers: Vec<ByteChunk>,
}

/// Sink collecting the framer output for inspection.
pub struct CollectSink(Rc<RefCell<Captured>>);

impl FrameSink for CollectSink {
    fn flow_def(&mut self, def: &FlowDef) {
        self.0.borrow_mut().flow_defs.push(def.clone());
    }

    fn frame(&mut self, frame: FramedPicture) {
        self.0.borrow_mut().frames.push(frame);
    }

    fn passthrough(&mut self, chunk: ByteChunk) {
        self.0.borrow_mut().markers.push(chunk);
    }

    fn event(&mut self, event: FramerEvent) {
        self.0.borrow_mut().events.push(event);
    }
}

/// A framer bound to a collecting sink.
pub fn framer() -> (Mpeg2Framer, Rc<RefCell<Captured>>) {
    let captured = Rc::new(RefCell::new(Captured::default()));
    let mut framer = Mpeg2Framer::new(EXPECTED_FLOW_DEF).expect("valid flow def");
    framer.set_output(Box::new(CollectSink(captured.clone())));
    (framer, captured)
}

/// Feed `data` in chunks of `chunk_size` bytes.
pub fn feed_chunked(framer: &mut Mpeg2Framer, data: &[u8], chunk_size: usize) {
    for piece in data.chunks(chunk_size) {
        framer.input(ByteChunk::new(piece.to_vec()));
    }
}
