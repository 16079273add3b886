//! PBM pixel regions (P1 and P4).
//!
//! A set bit is ink. Decoded bitmaps are gray buffers holding 0 (ink) and
//! 255 (paper); encoding marks gray samples below [`INK_THRESHOLD`] as ink.

use super::header::{Header, Scanner, TokenWriter};
use crate::buffer::{Channels, PixelBuffer};
use crate::codec::CodecError;

/// Gray samples below this are written as ink.
pub const INK_THRESHOLD: u8 = 128;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// Bytes per packed P4 row.
#[inline]
fn row_bytes(width: u32) -> usize {
    width.div_ceil(8) as usize
}

/// Decode P1 digits. Digits may be separated by whitespace or run together.
pub fn decode_ascii(header: &Header, scanner: &mut Scanner<'_>) -> Result<PixelBuffer, CodecError> {
    let expected = header.width as usize * header.height as usize;
    // Every ASCII token takes at least one byte
    let mut samples = Vec::with_capacity(expected.min(scanner.remaining().len()));

    while samples.len() < expected {
        let sample = match scanner.next_byte() {
            Some(b'0') => PAPER,
            Some(b'1') => INK,
            Some(b) => {
                return Err(CodecError::MalformedPixelData(format!(
                    "bitmap digit must be 0 or 1, found byte {b:#04x}"
                )))
            }
            None => {
                return Err(CodecError::TruncatedPixelData {
                    expected,
                    found: samples.len(),
                })
            }
        };
        samples.push(sample);
    }

    Ok(PixelBuffer::new(header.width, header.height, Channels::Gray, samples)?)
}

/// Decode packed P4 rows, most significant bit first.
pub fn decode_binary(header: &Header, data: &[u8]) -> Result<PixelBuffer, CodecError> {
    let stride = row_bytes(header.width);
    let expected = stride * header.height as usize;
    if data.len() < expected {
        return Err(CodecError::TruncatedPixelData {
            expected,
            found: data.len(),
        });
    }

    let width = header.width as usize;
    let mut samples = Vec::with_capacity(width * header.height as usize);
    for row in data[..expected].chunks_exact(stride) {
        samples.extend((0..width).map(|x| {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            if bit == 1 {
                INK
            } else {
                PAPER
            }
        }));
    }

    Ok(PixelBuffer::new(header.width, header.height, Channels::Gray, samples)?)
}

/// Write P1 digits, one token per pixel.
pub fn encode_ascii(gray: &PixelBuffer, out: &mut Vec<u8>) {
    let mut writer = TokenWriter::new(out);
    for &v in gray.samples() {
        writer.push(if v < INK_THRESHOLD { "1" } else { "0" });
    }
    writer.finish();
}

/// Pack gray rows into P4 bytes. Padding bits are zero.
pub fn encode_binary(gray: &PixelBuffer, out: &mut Vec<u8>) {
    let stride = row_bytes(gray.width());
    out.reserve(stride * gray.height() as usize);

    for row in gray.rows() {
        let mut packed = vec![0u8; stride];
        for (x, &v) in row.iter().enumerate() {
            if v < INK_THRESHOLD {
                packed[x / 8] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&packed);
    }
}
