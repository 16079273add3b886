//! Per-channel RGB arithmetic.
//!
//! Every adjustment is compiled into one 256-entry lookup table per channel
//! before the pixel loop, so the per-pixel cost is three table reads
//! regardless of the operation.

use serde::{Deserialize, Serialize};

use super::{for_each_pixel, TransformError};
use crate::buffer::{Channels, PixelBuffer};

/// Upper bound accepted for [`RgbAdjustment::Contrast`].
pub const MAX_CONTRAST: f32 = 10.0;

/// Largest absolute brightness delta.
pub const MAX_BRIGHTNESS: i16 = 255;

/// A point-wise operation on the R, G and B samples of each pixel.
///
/// Arithmetic saturates at 0 and 255. Alpha is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum RgbAdjustment {
    Add([u8; 3]),
    Subtract([u8; 3]),
    Multiply([u8; 3]),
    /// Integer division; a zero divisor is rejected by [`RgbAdjustment::validate`].
    Divide([u8; 3]),
    Invert,
    Brightness(i16),
    /// `(v - 128) * factor + 128`
    Contrast(f32),
}

impl RgbAdjustment {
    /// Parse the boundary string form, e.g. `["addition", "10", "0", "5"]`.
    ///
    /// # Errors
    ///
    /// - [`TransformError::UnsupportedTransform`] for an unknown operation name
    /// - [`TransformError::InvalidParameter`] for a wrong number of values or a
    ///   value that doesn't parse or is out of range
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, TransformError> {
        let (op, args) = values
            .split_first()
            .ok_or_else(|| TransformError::invalid("operation", "no operation given"))?;
        let op = op.as_ref().trim().to_ascii_lowercase();

        let adjustment = match op.as_str() {
            "addition" | "add" => RgbAdjustment::Add(parse_triplet(&op, args)?),
            "substraction" | "subtraction" | "subtract" => {
                RgbAdjustment::Subtract(parse_triplet(&op, args)?)
            }
            "multiplication" | "multiply" => RgbAdjustment::Multiply(parse_triplet(&op, args)?),
            "division" | "divide" => RgbAdjustment::Divide(parse_triplet(&op, args)?),
            "invert" => {
                expect_arity(&op, args, 0)?;
                RgbAdjustment::Invert
            }
            "brightness" => {
                expect_arity(&op, args, 1)?;
                let raw = args[0].as_ref().trim();
                let delta = raw
                    .parse::<i16>()
                    .map_err(|_| TransformError::invalid("brightness", format!("'{raw}' is not an integer")))?;
                RgbAdjustment::Brightness(delta)
            }
            "contrast" => {
                expect_arity(&op, args, 1)?;
                let raw = args[0].as_ref().trim();
                let factor = raw
                    .parse::<f32>()
                    .map_err(|_| TransformError::invalid("contrast", format!("'{raw}' is not a number")))?;
                RgbAdjustment::Contrast(factor)
            }
            other => return Err(TransformError::UnsupportedTransform(format!("rgb operation '{other}'"))),
        };

        adjustment.validate()?;
        Ok(adjustment)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), TransformError> {
        match *self {
            RgbAdjustment::Divide(divisors) if divisors.contains(&0) => {
                Err(TransformError::invalid("division", "divisor must be non-zero"))
            }
            RgbAdjustment::Brightness(delta) if !(-MAX_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&delta) => {
                Err(TransformError::invalid(
                    "brightness",
                    format!("must be between -{MAX_BRIGHTNESS} and {MAX_BRIGHTNESS}, got {delta}"),
                ))
            }
            RgbAdjustment::Contrast(factor) if !factor.is_finite() || !(0.0..=MAX_CONTRAST).contains(&factor) => {
                Err(TransformError::invalid(
                    "contrast",
                    format!("must be between 0 and {MAX_CONTRAST}, got {factor}"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Map one sample of channel `channel` (0 = R, 1 = G, 2 = B).
    fn map(&self, channel: usize, v: u8) -> u8 {
        match *self {
            RgbAdjustment::Add(values) => v.saturating_add(values[channel]),
            RgbAdjustment::Subtract(values) => v.saturating_sub(values[channel]),
            RgbAdjustment::Multiply(values) => {
                (v as u16 * values[channel] as u16).min(255) as u8
            }
            RgbAdjustment::Divide(values) => v / values[channel].max(1),
            RgbAdjustment::Invert => 255 - v,
            RgbAdjustment::Brightness(delta) => (v as i16).saturating_add(delta).clamp(0, 255) as u8,
            RgbAdjustment::Contrast(factor) => {
                ((v as f32 - 128.0) * factor + 128.0).round().clamp(0.0, 255.0) as u8
            }
        }
    }

    fn lookup_tables(&self) -> [[u8; 256]; 3] {
        let mut luts = [[0u8; 256]; 3];
        for (channel, lut) in luts.iter_mut().enumerate() {
            for (v, slot) in lut.iter_mut().enumerate() {
                *slot = self.map(channel, v as u8);
            }
        }
        luts
    }
}

fn expect_arity<S: AsRef<str>>(op: &str, args: &[S], n: usize) -> Result<(), TransformError> {
    if args.len() != n {
        return Err(TransformError::invalid(
            op,
            format!("expected {n} value(s), got {}", args.len()),
        ));
    }
    Ok(())
}

fn parse_triplet<S: AsRef<str>>(op: &str, args: &[S]) -> Result<[u8; 3], TransformError> {
    expect_arity(op, args, 3)?;
    let mut out = [0u8; 3];
    for ((slot, raw), name) in out.iter_mut().zip(args).zip(["r", "g", "b"]) {
        let raw = raw.as_ref().trim();
        let value: i64 = raw
            .parse()
            .map_err(|_| TransformError::invalid(name, format!("'{raw}' is not an integer")))?;
        *slot = u8::try_from(value)
            .map_err(|_| TransformError::invalid(name, format!("must be between 0 and 255, got {value}")))?;
    }
    Ok(out)
}

/// Apply an [`RgbAdjustment`] to every pixel.
///
/// Gray buffers stay gray; the red-channel parameters are used for the
/// single sample.
pub fn apply_rgb_adjustment(
    mut buffer: PixelBuffer,
    adjustment: &RgbAdjustment,
) -> Result<PixelBuffer, TransformError> {
    adjustment.validate()?;
    let luts = adjustment.lookup_tables();

    if buffer.channels() == Channels::Gray {
        let lut = luts[0];
        for_each_pixel(&mut buffer, move |px| px[0] = lut[px[0] as usize]);
    } else {
        for_each_pixel(&mut buffer, move |px| {
            px[0] = luts[0][px[0] as usize];
            px[1] = luts[1][px[1] as usize];
            px[2] = luts[2][px[2] as usize];
        });
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel(r: u8, g: u8, b: u8, a: u8) -> PixelBuffer {
        PixelBuffer::new(1, 1, Channels::Rgba, vec![r, g, b, a]).unwrap()
    }

    fn run(adj: RgbAdjustment, r: u8, g: u8, b: u8) -> Vec<u8> {
        apply_rgb_adjustment(one_pixel(r, g, b, 77), &adj)
            .unwrap()
            .into_samples()
    }

    #[test]
    fn test_add_saturates_per_channel() {
        assert_eq!(run(RgbAdjustment::Add([10, 20, 30]), 250, 100, 0), vec![255, 120, 30, 77]);
    }

    #[test]
    fn test_subtract_saturates() {
        assert_eq!(run(RgbAdjustment::Subtract([10, 200, 0]), 5, 100, 9), vec![0, 0, 9, 77]);
    }

    #[test]
    fn test_multiply_and_divide() {
        assert_eq!(run(RgbAdjustment::Multiply([2, 3, 0]), 100, 100, 100), vec![200, 255, 0, 77]);
        assert_eq!(run(RgbAdjustment::Divide([2, 3, 255]), 100, 100, 254), vec![50, 33, 0, 77]);
    }

    #[test]
    fn test_invert() {
        assert_eq!(run(RgbAdjustment::Invert, 0, 128, 255), vec![255, 127, 0, 77]);
    }

    #[test]
    fn test_brightness() {
        assert_eq!(run(RgbAdjustment::Brightness(-50), 30, 100, 255), vec![0, 50, 205, 77]);
        assert_eq!(run(RgbAdjustment::Brightness(50), 30, 100, 255), vec![80, 150, 255, 77]);
    }

    #[test]
    fn test_contrast() {
        assert_eq!(run(RgbAdjustment::Contrast(1.0), 0, 128, 255), vec![0, 128, 255, 77]);
        // (100 - 128) * 2 + 128 = 72; (200 - 128) * 2 + 128 = 272 -> 255
        assert_eq!(run(RgbAdjustment::Contrast(2.0), 100, 200, 128), vec![72, 255, 128, 77]);
        assert_eq!(run(RgbAdjustment::Contrast(0.0), 0, 77, 255), vec![128, 128, 128, 77]);
    }

    #[test]
    fn test_gray_uses_red_values() {
        let buf = PixelBuffer::new(2, 1, Channels::Gray, vec![10, 250]).unwrap();
        let out = apply_rgb_adjustment(buf, &RgbAdjustment::Add([20, 0, 0])).unwrap();
        assert_eq!(out.channels(), Channels::Gray);
        assert_eq!(out.samples(), &[30, 255]);
    }

    #[test]
    fn test_validate() {
        assert!(RgbAdjustment::Divide([1, 1, 0]).validate().is_err());
        assert!(RgbAdjustment::Brightness(256).validate().is_err());
        assert!(RgbAdjustment::Brightness(-255).validate().is_ok());
        assert!(RgbAdjustment::Contrast(f32::NAN).validate().is_err());
        assert!(RgbAdjustment::Contrast(10.5).validate().is_err());
        assert!(RgbAdjustment::Contrast(-0.1).validate().is_err());
        assert!(RgbAdjustment::Invert.validate().is_ok());
    }

    #[test]
    fn test_parse_triplets() {
        assert_eq!(
            RgbAdjustment::parse(&["addition", "10", "0", "5"]).unwrap(),
            RgbAdjustment::Add([10, 0, 5])
        );
        assert_eq!(
            RgbAdjustment::parse(&["substraction", "1", "2", "3"]).unwrap(),
            RgbAdjustment::Subtract([1, 2, 3])
        );
        assert_eq!(
            RgbAdjustment::parse(&["subtraction", "1", "2", "3"]).unwrap(),
            RgbAdjustment::Subtract([1, 2, 3])
        );
        assert_eq!(
            RgbAdjustment::parse(&["multiplication", "1", "2", "3"]).unwrap(),
            RgbAdjustment::Multiply([1, 2, 3])
        );
        assert_eq!(
            RgbAdjustment::parse(&["division", " 4 ", "2", "1"]).unwrap(),
            RgbAdjustment::Divide([4, 2, 1])
        );
    }

    #[test]
    fn test_parse_single_arg_ops() {
        assert_eq!(RgbAdjustment::parse(&["invert"]).unwrap(), RgbAdjustment::Invert);
        assert_eq!(
            RgbAdjustment::parse(&["brightness", "-20"]).unwrap(),
            RgbAdjustment::Brightness(-20)
        );
        assert_eq!(
            RgbAdjustment::parse(&["contrast", "1.5"]).unwrap(),
            RgbAdjustment::Contrast(1.5)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RgbAdjustment::parse(&["sepia", "1", "2", "3"]),
            Err(TransformError::UnsupportedTransform(_))
        ));
        assert!(matches!(
            RgbAdjustment::parse(&["addition", "1", "2"]),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RgbAdjustment::parse(&["addition", "1", "2", "256"]),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RgbAdjustment::parse(&["addition", "x", "2", "3"]),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RgbAdjustment::parse(&["division", "1", "0", "3"]),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RgbAdjustment::parse(&["invert", "1"]),
            Err(TransformError::InvalidParameter { .. })
        ));
        let empty: [&str; 0] = [];
        assert!(RgbAdjustment::parse(&empty).is_err());
    }

    #[test]
    fn test_parse_accepts_owned_strings() {
        let values = vec!["brightness".to_string(), "5".to_string()];
        assert_eq!(RgbAdjustment::parse(&values).unwrap(), RgbAdjustment::Brightness(5));
    }
}

// ===== Property-Based Tests =====
