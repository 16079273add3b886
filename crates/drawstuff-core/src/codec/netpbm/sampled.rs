//! PGM and PPM pixel regions (P2, P3, P5, P6).

use tracing::warn;

use super::header::{Header, Scanner, TokenWriter, ONE_BYTE_MAXVAL};
use crate::buffer::{Channels, PixelBuffer};
use crate::codec::CodecError;

/// Maxval written by the encoders.
pub const OUTPUT_MAXVAL: u32 = 255;

/// Map a sample in `0..=maxval` onto `0..=255`.
#[inline]
fn rescale(value: u32, maxval: u32) -> u8 {
    if maxval == OUTPUT_MAXVAL {
        return value as u8;
    }
    ((value * 255 + maxval / 2) / maxval) as u8
}

fn check_range(value: u32, maxval: u32) -> Result<u32, CodecError> {
    if value > maxval {
        return Err(CodecError::SampleOutOfRange { value, maxval });
    }
    Ok(value)
}

fn warn_if_rescaling(header: &Header) {
    if header.maxval != OUTPUT_MAXVAL {
        warn!(
            format = %header.format,
            maxval = header.maxval,
            "rescaling samples to 8 bits"
        );
    }
}

/// Decode whitespace-separated decimal samples.
pub fn decode_ascii(
    header: &Header,
    channels: Channels,
    scanner: &mut Scanner<'_>,
) -> Result<PixelBuffer, CodecError> {
    warn_if_rescaling(header);
    let expected = header.width as usize * header.height as usize * channels.count();
    // Every ASCII token takes at least one byte
    let mut samples = Vec::with_capacity(expected.min(scanner.remaining().len()));

    while samples.len() < expected {
        let value = scanner
            .next_number(CodecError::MalformedPixelData)?
            .ok_or(CodecError::TruncatedPixelData {
                expected,
                found: samples.len(),
            })?;
        samples.push(rescale(check_range(value, header.maxval)?, header.maxval));
    }

    Ok(PixelBuffer::new(header.width, header.height, channels, samples)?)
}

/// Decode raw samples: one byte each, or two bytes big-endian when maxval > 255.
pub fn decode_binary(
    header: &Header,
    channels: Channels,
    data: &[u8],
) -> Result<PixelBuffer, CodecError> {
    warn_if_rescaling(header);
    let count = header.width as usize * header.height as usize * channels.count();
    let wide = header.maxval > ONE_BYTE_MAXVAL;
    let expected = if wide { count * 2 } else { count };
    if data.len() < expected {
        return Err(CodecError::TruncatedPixelData {
            expected,
            found: data.len(),
        });
    }
    let data = &data[..expected];

    let samples = if wide {
        data.chunks_exact(2)
            .map(|pair| {
                let value = u32::from(u16::from_be_bytes([pair[0], pair[1]]));
                check_range(value, header.maxval).map(|v| rescale(v, header.maxval))
            })
            .collect::<Result<Vec<u8>, _>>()?
    } else {
        data.iter()
            .map(|&b| check_range(u32::from(b), header.maxval).map(|v| rescale(v, header.maxval)))
            .collect::<Result<Vec<u8>, _>>()?
    };

    Ok(PixelBuffer::new(header.width, header.height, channels, samples)?)
}

/// Write decimal samples, wrapping lines at 70 characters.
pub fn encode_ascii(buffer: &PixelBuffer, out: &mut Vec<u8>) {
    let mut writer = TokenWriter::new(out);
    for v in buffer.samples() {
        writer.push(&v.to_string());
    }
    writer.finish();
}

/// Write raw 8-bit samples.
pub fn encode_binary(buffer: &PixelBuffer, out: &mut Vec<u8>) {
    out.extend_from_slice(buffer.samples());
}
