//! RGB ↔ CMYK conversion.
//!
//! RGB channels live on the 0-255 scale, CMYK channels on a 0-100 percentage
//! scale. Inputs outside those ranges are rejected with
//! [`ColorError::InvalidArgument`]; only computed outputs are clamped, to absorb
//! rounding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound of an RGB channel.
pub const RGB_MAX: i32 = 255;

/// Upper bound of a CMYK channel (percent).
pub const CMYK_MAX: i32 = 100;

/// Errors raised by the colour conversion functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// A channel value is outside its declared range.
    #[error("Invalid argument: {channel} must be between 0 and {max}, got {value}")]
    InvalidArgument {
        channel: &'static str,
        value: i32,
        max: i32,
    },
}

/// An RGB colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A CMYK colour with each channel expressed in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cmyk {
    pub c: u8,
    pub m: u8,
    pub y: u8,
    pub k: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to CMYK. Always succeeds since every `u8` is a valid RGB channel.
    pub fn to_cmyk(self) -> Cmyk {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let k = 1.0 - r.max(g).max(b);

        // Pure black: c, m and y are undefined (0/0), pin them to zero.
        if k >= 1.0 {
            return Cmyk {
                c: 0,
                m: 0,
                y: 0,
                k: 100,
            };
        }

        let c = (1.0 - r - k) / (1.0 - k);
        let m = (1.0 - g - k) / (1.0 - k);
        let y = (1.0 - b - k) / (1.0 - k);

        Cmyk {
            c: to_percent(c),
            m: to_percent(m),
            y: to_percent(y),
            k: to_percent(k),
        }
    }
}

impl Cmyk {
    /// Create a CMYK colour, validating that every channel is within 0-100.
    pub fn new(c: u8, m: u8, y: u8, k: u8) -> Result<Self, ColorError> {
        check_range("c", c as i32, CMYK_MAX)?;
        check_range("m", m as i32, CMYK_MAX)?;
        check_range("y", y as i32, CMYK_MAX)?;
        check_range("k", k as i32, CMYK_MAX)?;
        Ok(Self { c, m, y, k })
    }

    /// Convert to RGB.
    ///
    /// Channels above 100 (only reachable by building the struct literally)
    /// saturate at 100.
    pub fn to_rgb(self) -> Rgb {
        let k = 1.0 - percent(self.k);
        Rgb {
            r: to_channel(255.0 * (1.0 - percent(self.c)) * k),
            g: to_channel(255.0 * (1.0 - percent(self.m)) * k),
            b: to_channel(255.0 * (1.0 - percent(self.y)) * k),
        }
    }
}

/// Convert RGB channels (0-255) to CMYK percentages (0-100).
///
/// # Errors
///
/// Returns [`ColorError::InvalidArgument`] if any channel is outside 0-255.
///
/// # Example
///
/// ```
/// use drawstuff_core::color::rgb_to_cmyk;
///
/// let cmyk = rgb_to_cmyk(255, 0, 0).unwrap();
/// assert_eq!((cmyk.c, cmyk.m, cmyk.y, cmyk.k), (0, 100, 100, 0));
/// ```
pub fn rgb_to_cmyk(r: i32, g: i32, b: i32) -> Result<Cmyk, ColorError> {
    let r = check_range("r", r, RGB_MAX)?;
    let g = check_range("g", g, RGB_MAX)?;
    let b = check_range("b", b, RGB_MAX)?;
    Ok(Rgb::new(r, g, b).to_cmyk())
}

/// Convert CMYK percentages (0-100) to RGB channels (0-255).
///
/// # Errors
///
/// Returns [`ColorError::InvalidArgument`] if any channel is outside 0-100.
pub fn cmyk_to_rgb(c: i32, m: i32, y: i32, k: i32) -> Result<Rgb, ColorError> {
    let cmyk = Cmyk {
        c: check_range("c", c, CMYK_MAX)?,
        m: check_range("m", m, CMYK_MAX)?,
        y: check_range("y", y, CMYK_MAX)?,
        k: check_range("k", k, CMYK_MAX)?,
    };
    Ok(cmyk.to_rgb())
}

fn check_range(channel: &'static str, value: i32, max: i32) -> Result<u8, ColorError> {
    if (0..=max).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ColorError::InvalidArgument {
            channel,
            value,
            max,
        })
    }
}

#[inline]
fn percent(value: u8) -> f64 {
    value.min(100) as f64 / 100.0
}

#[inline]
fn to_percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

#[inline]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primaries_to_cmyk() {
        assert_eq!(rgb_to_cmyk(255, 0, 0).unwrap(), Cmyk { c: 0, m: 100, y: 100, k: 0 });
        assert_eq!(rgb_to_cmyk(0, 255, 0).unwrap(), Cmyk { c: 100, m: 0, y: 100, k: 0 });
        assert_eq!(rgb_to_cmyk(0, 0, 255).unwrap(), Cmyk { c: 100, m: 100, y: 0, k: 0 });
    }

    #[test]
    fn test_white_and_black() {
        assert_eq!(rgb_to_cmyk(255, 255, 255).unwrap(), Cmyk { c: 0, m: 0, y: 0, k: 0 });
        // Black must not divide by zero
        assert_eq!(rgb_to_cmyk(0, 0, 0).unwrap(), Cmyk { c: 0, m: 0, y: 0, k: 100 });
    }

    #[test]
    fn test_mid_gray_to_cmyk() {
        // k = 1 - 128/255 = 0.498 -> 50
        assert_eq!(rgb_to_cmyk(128, 128, 128).unwrap(), Cmyk { c: 0, m: 0, y: 0, k: 50 });
    }

    #[test]
    fn test_cmyk_to_rgb_known_values() {
        assert_eq!(cmyk_to_rgb(0, 0, 0, 0).unwrap(), Rgb::new(255, 255, 255));
        assert_eq!(cmyk_to_rgb(0, 0, 0, 100).unwrap(), Rgb::new(0, 0, 0));
        assert_eq!(cmyk_to_rgb(100, 0, 0, 0).unwrap(), Rgb::new(0, 255, 255));
        // 255 * 0.5 * 0.5 = 63.75 -> 64
        assert_eq!(cmyk_to_rgb(50, 50, 50, 50).unwrap(), Rgb::new(64, 64, 64));
    }

    #[test]
    fn test_rgb_out_of_range_rejected() {
        assert_eq!(
            rgb_to_cmyk(256, 0, 0),
            Err(ColorError::InvalidArgument { channel: "r", value: 256, max: 255 })
        );
        assert!(rgb_to_cmyk(0, -1, 0).is_err());
        assert!(rgb_to_cmyk(0, 0, 1000).is_err());
    }

    #[test]
    fn test_cmyk_out_of_range_rejected() {
        assert_eq!(
            cmyk_to_rgb(0, 0, 0, 101),
            Err(ColorError::InvalidArgument { channel: "k", value: 101, max: 100 })
        );
        assert!(cmyk_to_rgb(-5, 0, 0, 0).is_err());
        assert!(Cmyk::new(0, 200, 0, 0).is_err());
    }

    #[test]
    fn test_grays_round_trip_exactly_within_one() {
        for v in 0..=255u8 {
            let back = Rgb::new(v, v, v).to_cmyk().to_rgb();
            assert!((back.r as i32 - v as i32).abs() <= 1, "gray {} came back as {:?}", v, back);
            assert_eq!(back.r, back.g);
            assert_eq!(back.g, back.b);
        }
    }

    #[test]
    fn test_error_display() {
        let err = rgb_to_cmyk(300, 0, 0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: r must be between 0 and 255, got 300");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
