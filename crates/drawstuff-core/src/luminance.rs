//! Luma calculation using ITU-R BT.601 coefficients.
//!
//! The grayscale transform, channel-layout conversions, histograms and
//! binarization all share these helpers so that "gray" means the same thing
//! everywhere in the crate.

/// ITU-R BT.601 coefficient for the red channel.
pub const LUMA_R: f32 = 0.299;

/// ITU-R BT.601 coefficient for the green channel.
pub const LUMA_G: f32 = 0.587;

/// ITU-R BT.601 coefficient for the blue channel.
pub const LUMA_B: f32 = 0.114;

/// Weighted luma from u8 RGB values, rounded to the nearest integer.
///
/// `Y = round(0.299 R + 0.587 G + 0.114 B)`
#[inline]
pub fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Unweighted mean of the three channels, rounded to the nearest integer.
#[inline]
pub fn average_u8(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u16 + g as u16 + b as u16;
    // Integer round-half-up of sum / 3
    ((sum + 1) / 3) as u8
}
