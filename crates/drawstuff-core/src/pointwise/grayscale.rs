//! Grayscale conversion that keeps the channel layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{for_each_pixel, TransformError};
use crate::buffer::{Channels, PixelBuffer};
use crate::luminance::{average_u8, luma_u8};

/// How the gray value is derived from R, G and B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrayscaleMethod {
    /// BT.601 luma: `round(0.299 R + 0.587 G + 0.114 B)`.
    #[default]
    Weighted,
    /// Plain mean: `round((R + G + B) / 3)`.
    Average,
}

impl FromStr for GrayscaleMethod {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weights" | "weighted" | "luma" => Ok(GrayscaleMethod::Weighted),
            "average" | "mean" => Ok(GrayscaleMethod::Average),
            other => Err(TransformError::UnsupportedTransform(format!(
                "grayscale method '{other}'"
            ))),
        }
    }
}

impl fmt::Display for GrayscaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrayscaleMethod::Weighted => f.write_str("weights"),
            GrayscaleMethod::Average => f.write_str("average"),
        }
    }
}

/// Replace every pixel's R, G and B with one gray value. Alpha is untouched
/// and gray buffers are returned as-is.
pub fn apply_grayscale(mut buffer: PixelBuffer, method: GrayscaleMethod) -> PixelBuffer {
    if buffer.channels() == Channels::Gray {
        return buffer;
    }

    let gray: fn(u8, u8, u8) -> u8 = match method {
        GrayscaleMethod::Weighted => luma_u8,
        GrayscaleMethod::Average => average_u8,
    };

    for_each_pixel(&mut buffer, |px| {
        let y = gray(px[0], px[1], px[2]);
        px[0] = y;
        px[1] = y;
        px[2] = y;
    });
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(samples: Vec<u8>) -> PixelBuffer {
        let width = (samples.len() / 4) as u32;
        PixelBuffer::new(width, 1, Channels::Rgba, samples).unwrap()
    }

    #[test]
    fn test_weighted_primaries() {
        let buf = PixelBuffer::new(3, 1, Channels::Rgb, vec![255, 0, 0, 0, 255, 0, 0, 0, 255])
            .unwrap();
        let out = apply_grayscale(buf, GrayscaleMethod::Weighted);
        assert_eq!(out.channels(), Channels::Rgb);
        assert_eq!(out.samples(), &[76, 76, 76, 150, 150, 150, 29, 29, 29]);
    }

    #[test]
    fn test_average() {
        let buf = PixelBuffer::new(1, 1, Channels::Rgb, vec![90, 30, 0]).unwrap();
        let out = apply_grayscale(buf, GrayscaleMethod::Average);
        assert_eq!(out.samples(), &[40, 40, 40]);
    }

    #[test]
    fn test_alpha_untouched() {
        let out = apply_grayscale(rgba(vec![255, 0, 0, 17, 0, 0, 0, 200]), GrayscaleMethod::Weighted);
        assert_eq!(out.samples(), &[76, 76, 76, 17, 0, 0, 0, 200]);
    }

    #[test]
    fn test_gray_buffer_unchanged() {
        let buf = PixelBuffer::new(2, 1, Channels::Gray, vec![3, 250]).unwrap();
        assert_eq!(apply_grayscale(buf.clone(), GrayscaleMethod::Average), buf);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("weights".parse::<GrayscaleMethod>().unwrap(), GrayscaleMethod::Weighted);
        assert_eq!("Average".parse::<GrayscaleMethod>().unwrap(), GrayscaleMethod::Average);
        assert!(matches!(
            "sepia".parse::<GrayscaleMethod>(),
            Err(TransformError::UnsupportedTransform(_))
        ));
        assert_eq!(GrayscaleMethod::Weighted.to_string(), "weights");
    }
}
