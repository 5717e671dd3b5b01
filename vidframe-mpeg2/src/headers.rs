//! Pure decoders for MPEG-2 headers.
//!
//! Every decoder takes a byte region beginning at the 4-byte start code and
//! produces a typed record. Short regions are reported as
//! [`Mpeg2Error::InsufficientData`], so a frame cut off in the middle of a
//! header surfaces as a decode failure rather than garbage fields.

use crate::types::*;
use crate::{
    Mpeg2Error, Result, EXTENSION_START_CODE, GOP_HEADER_SIZE, GOP_START_CODE,
    PICTURE_CODING_EXTENSION_ID, PICTURE_EXTENSION_SIZE, PICTURE_HEADER_SIZE, PICTURE_START_CODE,
    SEQUENCE_DISPLAY_COLOR_SIZE, SEQUENCE_DISPLAY_EXTENSION_ID, SEQUENCE_DISPLAY_SIZE,
    SEQUENCE_EXTENSION_ID, SEQUENCE_EXTENSION_SIZE, SEQUENCE_HEADER_CODE, SEQUENCE_HEADER_SIZE,
};

/// Decode the fixed part of a sequence header.
pub fn decode_sequence_header(data: &[u8]) -> Result<SequenceHeader> {
    require(data, SEQUENCE_HEADER_SIZE)?;
    expect_start_code(data, SEQUENCE_HEADER_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let horizontal = reader.read_bits(12)? as u16;
    let vertical = reader.read_bits(12)? as u16;
    let aspect_code = reader.read_bits(4)? as u8;
    let aspect_ratio =
        AspectRatio::from_code(aspect_code).ok_or(Mpeg2Error::InvalidAspectRatio(aspect_code))?;
    let frame_rate_code = reader.read_bits(4)? as u8;
    let bit_rate = reader.read_bits(18)?;
    // marker_bit
    let _ = reader.read_bit()?;
    let vbv_buffer_size = reader.read_bits(10)? as u16;

    Ok(SequenceHeader {
        horizontal,
        vertical,
        aspect_ratio,
        frame_rate_code,
        bit_rate,
        vbv_buffer_size,
    })
}

/// Decode a sequence extension.
pub fn decode_sequence_extension(data: &[u8]) -> Result<SequenceExtension> {
    require(data, SEQUENCE_EXTENSION_SIZE)?;
    expect_start_code(data, EXTENSION_START_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let ext_id = reader.read_bits(4)? as u8;
    if ext_id != SEQUENCE_EXTENSION_ID {
        return Err(Mpeg2Error::InvalidExtensionId(ext_id));
    }

    let profile_and_level = reader.read_bits(8)? as u8;
    let progressive_sequence = reader.read_bit()? == 1;
    let chroma_code = reader.read_bits(2)? as u8;
    let chroma_format = ChromaFormat::from_code(chroma_code)
        .ok_or(Mpeg2Error::UnsupportedChromaFormat(chroma_code))?;
    let horizontal_size_extension = reader.read_bits(2)? as u8;
    let vertical_size_extension = reader.read_bits(2)? as u8;
    let bit_rate_extension = reader.read_bits(12)? as u16;
    // marker_bit
    let _ = reader.read_bit()?;
    let vbv_buffer_size_extension = reader.read_bits(8)? as u8;
    let low_delay = reader.read_bit()? == 1;
    let frame_rate_extension_n = reader.read_bits(2)? as u8;
    let frame_rate_extension_d = reader.read_bits(5)? as u8;

    Ok(SequenceExtension {
        profile_and_level,
        progressive_sequence,
        chroma_format,
        horizontal_size_extension,
        vertical_size_extension,
        bit_rate_extension,
        vbv_buffer_size_extension,
        low_delay,
        frame_rate_extension_n,
        frame_rate_extension_d,
    })
}

/// Decode a sequence display extension.
pub fn decode_sequence_display_extension(data: &[u8]) -> Result<SequenceDisplayExtension> {
    require(data, SEQUENCE_DISPLAY_SIZE)?;
    expect_start_code(data, EXTENSION_START_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let ext_id = reader.read_bits(4)? as u8;
    if ext_id != SEQUENCE_DISPLAY_EXTENSION_ID {
        return Err(Mpeg2Error::InvalidExtensionId(ext_id));
    }

    let video_format = reader.read_bits(3)? as u8;
    let colour_description = reader.read_bit()? == 1;
    if colour_description {
        require(data, SEQUENCE_DISPLAY_SIZE + SEQUENCE_DISPLAY_COLOR_SIZE)?;
        // colour_primaries, transfer_characteristics, matrix_coefficients
        let _ = reader.read_bits(24)?;
    }
    let display_horizontal = reader.read_bits(14)? as u16;
    // marker_bit
    let _ = reader.read_bit()?;
    let display_vertical = reader.read_bits(14)? as u16;

    Ok(SequenceDisplayExtension {
        video_format,
        colour_description,
        display_horizontal,
        display_vertical,
    })
}

/// Decode a GOP header.
pub fn decode_gop_header(data: &[u8]) -> Result<GopHeader> {
    require(data, GOP_HEADER_SIZE)?;
    expect_start_code(data, GOP_START_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let drop_frame = reader.read_bit()? == 1;
    let hours = reader.read_bits(5)? as u8;
    let minutes = reader.read_bits(6)? as u8;
    // marker_bit
    let _ = reader.read_bit()?;
    let seconds = reader.read_bits(6)? as u8;
    let pictures = reader.read_bits(6)? as u8;
    let closed_gop = reader.read_bit()? == 1;
    let broken_link = reader.read_bit()? == 1;

    Ok(GopHeader {
        drop_frame,
        hours,
        minutes,
        seconds,
        pictures,
        closed_gop,
        broken_link,
    })
}

/// Decode the fixed part of a picture header.
pub fn decode_picture_header(data: &[u8]) -> Result<PictureHeader> {
    require(data, PICTURE_HEADER_SIZE)?;
    expect_start_code(data, PICTURE_START_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let temporal_reference = reader.read_bits(10)? as u16;
    let type_code = reader.read_bits(3)? as u8;
    let coding_type =
        PictureCodingType::from_code(type_code).ok_or(Mpeg2Error::InvalidPictureType(type_code))?;
    let vbv_delay = reader.read_bits(16)? as u16;

    Ok(PictureHeader {
        temporal_reference,
        coding_type,
        vbv_delay,
    })
}

/// Decode a picture coding extension.
pub fn decode_picture_coding_extension(data: &[u8]) -> Result<PictureCodingExtension> {
    require(data, PICTURE_EXTENSION_SIZE)?;
    expect_start_code(data, EXTENSION_START_CODE)?;
    let mut reader = BitReader::new(&data[4..]);

    let ext_id = reader.read_bits(4)? as u8;
    if ext_id != PICTURE_CODING_EXTENSION_ID {
        return Err(Mpeg2Error::InvalidExtensionId(ext_id));
    }

    // f_code[0][0], f_code[0][1], f_code[1][0], f_code[1][1]
    let _ = reader.read_bits(16)?;
    let intra_dc_precision = reader.read_bits(2)? as u8;
    let structure_code = reader.read_bits(2)? as u8;
    let picture_structure = PictureStructure::from_code(structure_code)
        .ok_or(Mpeg2Error::InvalidPictureStructure(structure_code))?;
    let top_field_first = reader.read_bit()? == 1;
    // frame_pred_frame_dct, concealment_motion_vectors, q_scale_type,
    // intra_vlc_format, alternate_scan
    let _ = reader.read_bits(5)?;
    let repeat_first_field = reader.read_bit()? == 1;
    // chroma_420_type
    let _ = reader.read_bit()?;
    let progressive_frame = reader.read_bit()? == 1;

    Ok(PictureCodingExtension {
        intra_dc_precision,
        picture_structure,
        top_field_first,
        repeat_first_field,
        progressive_frame,
    })
}

fn require(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(Mpeg2Error::InsufficientData {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn expect_start_code(data: &[u8], code: u8) -> Result<()> {
    if data[0] != 0x00 || data[1] != 0x00 || data[2] != 0x01 || data[3] != code {
        return Err(Mpeg2Error::InvalidStartCode {
            expected: code,
            found: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
        });
    }
    Ok(())
}

/// Simple big-endian bit reader over a header region.
#[derive(Debug)]
struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    fn read_bit(&mut self) -> Result<u8> {
        if self.byte_pos >= self.data.len() {
            return Err(Mpeg2Error::InsufficientData {
                needed: self.byte_pos + 1,
                available: self.data.len(),
            });
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit)
    }

    fn read_bits(&mut self, count: u8) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }
}
