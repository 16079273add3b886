//! Netpbm codec: PBM (P1/P4), PGM (P2/P5) and PPM (P3/P6).
//!
//! [`header`] holds the grammar every variant shares. [`bitmap`] and
//! [`sampled`] only deal with the pixel region that follows it.

pub mod bitmap;
pub mod header;
pub mod sampled;

use std::borrow::Cow;

use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::codec::{CodecError, CodecLimits, Decoded, ImageFormat, NetpbmFamily};
use header::{parse_header, write_header, Scanner};

/// Decode any of the six Netpbm variants.
///
/// Bitmaps and graymaps decode to gray buffers, pixmaps to RGB. Samples are
/// rescaled to 0-255 when the header declares another maxval.
pub fn decode(bytes: &[u8], limits: &CodecLimits) -> Result<Decoded, CodecError> {
    let mut scanner = Scanner::new(bytes);
    let header = parse_header(&mut scanner)?;
    let channels = header.format.channels();
    limits.check(header.width, header.height, channels)?;

    debug!(
        format = %header.format,
        width = header.width,
        height = header.height,
        maxval = header.maxval,
        comments = header.comments.len(),
        "parsed netpbm header"
    );

    let buffer = match (header.format.family(), header.format.is_plain()) {
        (Some(NetpbmFamily::Bitmap), true) => bitmap::decode_ascii(&header, &mut scanner)?,
        (Some(NetpbmFamily::Bitmap), false) => bitmap::decode_binary(&header, scanner.remaining())?,
        (_, true) => sampled::decode_ascii(&header, channels, &mut scanner)?,
        (_, false) => sampled::decode_binary(&header, channels, scanner.remaining())?,
    };

    Ok(Decoded {
        buffer,
        comments: header.comments,
    })
}

/// Encode `buffer` as a Netpbm variant, converting it to gray (PBM, PGM) or
/// RGB (PPM) first. Each entry of `comments` becomes a `#` header line.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedFormat`] for [`ImageFormat::Jpeg`].
pub fn encode(
    buffer: &PixelBuffer,
    format: ImageFormat,
    comments: &[String],
) -> Result<Vec<u8>, CodecError> {
    let family = format
        .family()
        .ok_or_else(|| CodecError::UnsupportedFormat(format!("{format} is not a Netpbm format")))?;

    let layout = format.channels();
    let buffer: Cow<'_, PixelBuffer> = if buffer.channels() == layout {
        Cow::Borrowed(buffer)
    } else {
        Cow::Owned(buffer.clone().with_channels(layout))
    };

    let maxval = match family {
        NetpbmFamily::Bitmap => None,
        NetpbmFamily::Graymap | NetpbmFamily::Pixmap => Some(sampled::OUTPUT_MAXVAL),
    };

    let mut out = Vec::with_capacity(buffer.byte_len() + 64);
    write_header(&mut out, format, buffer.width(), buffer.height(), maxval, comments);

    match (family, format.is_plain()) {
        (NetpbmFamily::Bitmap, true) => bitmap::encode_ascii(&buffer, &mut out),
        (NetpbmFamily::Bitmap, false) => bitmap::encode_binary(&buffer, &mut out),
        (_, true) => sampled::encode_ascii(&buffer, &mut out),
        (_, false) => sampled::encode_binary(&buffer, &mut out),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Channels;

    fn rgb_2x2() -> PixelBuffer {
        PixelBuffer::new(
            2,
            2,
            Channels::Rgb,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        )
        .unwrap()
    }

    fn roundtrip(buffer: &PixelBuffer, format: ImageFormat) -> PixelBuffer {
        let bytes = encode(buffer, format, &[]).unwrap();
        decode(&bytes, &CodecLimits::default()).unwrap().buffer
    }

    #[test]
    fn test_p3_round_trip_2x2() {
        let buf = rgb_2x2();
        assert_eq!(roundtrip(&buf, ImageFormat::PpmP3), buf);
    }

    #[test]
    fn test_p3_text() {
        let bytes = encode(&rgb_2x2(), ImageFormat::PpmP3, &[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "P3\n2 2\n255\n255 0 0 0 255 0 0 0 255 255 255 255\n"
        );
    }

    #[test]
    fn test_p6_layout_2x2() {
        let bytes = encode(&rgb_2x2(), ImageFormat::PpmP6, &[]).unwrap();
        let header = b"P6\n2 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 12);
        assert_eq!(&bytes[header.len()..], rgb_2x2().samples());
    }

    #[test]
    fn test_comments_written_and_read_back() {
        let comments = vec!["drawn with draw stuff".to_string()];
        let bytes = encode(&rgb_2x2(), ImageFormat::PpmP6, &comments).unwrap();
        assert!(bytes.starts_with(b"P6\n# drawn with draw stuff\n2 2\n255\n"));
        let decoded = decode(&bytes, &CodecLimits::default()).unwrap();
        assert_eq!(decoded.comments, comments);
        assert_eq!(decoded.buffer, rgb_2x2());
    }

    #[test]
    fn test_encode_converts_layout() {
        let rgba = rgb_2x2().to_rgba();
        let pgm = encode(&rgba, ImageFormat::PgmP5, &[]).unwrap();
        assert_eq!(&pgm[b"P5\n2 2\n255\n".len()..], &[76, 150, 29, 255]);

        let pbm = encode(&rgba, ImageFormat::PbmP1, &[]).unwrap();
        // luma 76, 150, 29, 255 -> ink, paper, ink, paper
        assert_eq!(pbm, b"P1\n2 2\n1 0 1 0\n");

        let gray = PixelBuffer::new(1, 1, Channels::Gray, vec![9]).unwrap();
        let ppm = encode(&gray, ImageFormat::PpmP3, &[]).unwrap();
        assert_eq!(ppm, b"P3\n1 1\n255\n9 9 9\n");
    }

    #[test]
    fn test_encode_rejects_jpeg() {
        assert!(matches!(
            encode(&rgb_2x2(), ImageFormat::Jpeg, &[]),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_decode_respects_limits() {
        let limits = CodecLimits { max_buffer_bytes: 1024 };
        assert!(matches!(
            decode(b"P6\n100 100\n255\n", &limits),
            Err(CodecError::DimensionOverflow { width: 100, height: 100, limit: 1024 })
        ));
        // Header alone claims a huge image; rejected before any allocation
        assert!(matches!(
            decode(b"P5\n4000000000 4000000000\n255\n", &CodecLimits::default()),
            Err(CodecError::DimensionOverflow { .. })
        ));
    }

    #[test]
    fn test_decode_maxval_rescaling() {
        let decoded = decode(b"P2\n3 1\n15\n0 7 15\n", &CodecLimits::default()).unwrap();
        assert_eq!(decoded.buffer.samples(), &[0, 119, 255]);
    }

    #[test]
    fn test_decode_channels_per_family() {
        let limits = CodecLimits::default();
        assert_eq!(decode(b"P1 1 1 1", &limits).unwrap().buffer.channels(), Channels::Gray);
        assert_eq!(decode(b"P2 1 1 255 7", &limits).unwrap().buffer.channels(), Channels::Gray);
        assert_eq!(decode(b"P3 1 1 255 1 2 3", &limits).unwrap().buffer.channels(), Channels::Rgb);
    }
}

// ===== Property-Based Tests =====

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::buffer::Channels;
    use proptest::prelude::*;

    fn dims() -> impl Strategy<Value = (u32, u32)> {
        (1u32..=20, 1u32..=20)
    }

    fn buffer(channels: Channels) -> impl Strategy<Value = PixelBuffer> {
        dims().prop_flat_map(move |(w, h)| {
            let len = (w * h) as usize * channels.count();
            prop::collection::vec(any::<u8>(), len..=len)
                .prop_map(move |s| PixelBuffer::new(w, h, channels, s).unwrap())
        })
    }

    fn bitmap_buffer() -> impl Strategy<Value = PixelBuffer> {
        dims().prop_flat_map(|(w, h)| {
            let len = (w * h) as usize;
            prop::collection::vec(prop::bool::ANY, len..=len).prop_map(move |bits| {
                let samples = bits.into_iter().map(|ink| if ink { 0 } else { 255 }).collect();
                PixelBuffer::new(w, h, Channels::Gray, samples).unwrap()
            })
        })
    }

    fn roundtrip(buffer: &PixelBuffer, format: ImageFormat) -> PixelBuffer {
        let bytes = encode(buffer, format, &[]).unwrap();
        decode(&bytes, &CodecLimits::default()).unwrap().buffer
    }

    proptest! {
        /// Property: graymaps round-trip exactly in both encodings.
        #[test]
        fn prop_graymap_round_trip(buf in buffer(Channels::Gray)) {
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PgmP2), &buf);
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PgmP5), &buf);
        }

        /// Property: pixmaps round-trip exactly in both encodings.
        #[test]
        fn prop_pixmap_round_trip(buf in buffer(Channels::Rgb)) {
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PpmP3), &buf);
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PpmP6), &buf);
        }

        /// Property: 0/255 bitmaps round-trip exactly, including widths that
        /// are not a multiple of 8.
        #[test]
        fn prop_bitmap_round_trip(buf in bitmap_buffer()) {
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PbmP1), &buf);
            prop_assert_eq!(&roundtrip(&buf, ImageFormat::PbmP4), &buf);
        }

        /// Property: P4 output is exactly header + ceil(w/8) * h bytes.
        #[test]
        fn prop_p4_size(buf in bitmap_buffer()) {
            let bytes = encode(&buf, ImageFormat::PbmP4, &[]).unwrap();
            let header_len = format!("P4\n{} {}\n", buf.width(), buf.height()).len();
            let packed = buf.width().div_ceil(8) as usize * buf.height() as usize;
            prop_assert_eq!(bytes.len(), header_len + packed);
        }

        /// Property: decoding arbitrary bytes never panics.
        #[test]
        fn prop_decode_never_panics(magic in 1u8..=6, body in prop::collection::vec(any::<u8>(), 0..64)) {
            let mut bytes = vec![b'P', b'0' + magic];
            bytes.extend(body);
            let _ = decode(&bytes, &CodecLimits::default());
        }
    }
}
