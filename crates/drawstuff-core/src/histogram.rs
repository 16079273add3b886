//! Histograms and the luminance-based tone operations built on them.
//!
//! [`compute_histogram`] bins red, green, blue and BT.601 luminance. The
//! [`stretch`] and [`equalize`] operations remap luminance and return a gray
//! buffer, ready for PGM or PBM export.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::buffer::{Channels, PixelBuffer};
use crate::luminance::luma_u8;
use crate::pointwise::TransformError;

/// 256-bin histograms for each colour channel and for luminance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub red: [u32; 256],
    pub green: [u32; 256],
    pub blue: [u32; 256],
    pub luminance: [u32; 256],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
            luminance: [0; 256],
        }
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest luminance bin, for display scaling.
    pub fn peak(&self) -> u32 {
        self.luminance.iter().copied().max().unwrap_or(0)
    }

    /// Darkest and brightest luma present; `None` for an empty histogram.
    ///
    /// This is the range [`stretch`] maps onto 0-255.
    pub fn luminance_range(&self) -> Option<(u8, u8)> {
        let low = self.luminance.iter().position(|&n| n > 0)?;
        let high = self.luminance.iter().rposition(|&n| n > 0)?;
        Some((low as u8, high as u8))
    }

    /// Number of pixels binned.
    pub fn total(&self) -> u64 {
        self.luminance.iter().map(|&n| u64::from(n)).sum()
    }
}

/// Bin every pixel of `buffer`. Alpha is ignored; gray samples count for all
/// three colour channels.
pub fn compute_histogram(buffer: &PixelBuffer) -> Histogram {
    let mut hist = Histogram::new();

    match buffer.channels() {
        Channels::Gray => {
            for &v in buffer.samples() {
                let i = v as usize;
                hist.red[i] += 1;
                hist.green[i] += 1;
                hist.blue[i] += 1;
                hist.luminance[i] += 1;
            }
        }
        Channels::Rgb | Channels::Rgba => {
            for px in buffer.samples().chunks_exact(buffer.channels().count()) {
                hist.red[px[0] as usize] += 1;
                hist.green[px[1] as usize] += 1;
                hist.blue[px[2] as usize] += 1;
                hist.luminance[luma_u8(px[0], px[1], px[2]) as usize] += 1;
            }
        }
    }

    hist
}

/// Which histogram operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramMode {
    Stretch,
    Equalize,
}

impl FromStr for HistogramMode {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stretch" => Ok(HistogramMode::Stretch),
            "equalize" | "equalise" => Ok(HistogramMode::Equalize),
            other => Err(TransformError::UnsupportedTransform(format!(
                "histogram operation '{other}'"
            ))),
        }
    }
}

/// Run `mode` on `buffer`.
pub fn apply_histogram(buffer: PixelBuffer, mode: HistogramMode) -> PixelBuffer {
    match mode {
        HistogramMode::Stretch => stretch(buffer),
        HistogramMode::Equalize => equalize(buffer),
    }
}

fn remap(mut gray: PixelBuffer, lut: &[u8; 256]) -> PixelBuffer {
    for v in gray.samples_mut() {
        *v = lut[*v as usize];
    }
    gray
}

/// Linearly stretch the luminance range onto 0-255.
///
/// Returns a gray buffer. A flat image comes back as its plain gray
/// conversion.
pub fn stretch(buffer: PixelBuffer) -> PixelBuffer {
    let gray = buffer.to_gray();
    let (min, max) = gray
        .samples()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min >= max {
        return gray;
    }

    let range = f32::from(max - min);
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate().skip(min as usize).take((max - min) as usize + 1) {
        *slot = ((v as f32 - f32::from(min)) * 255.0 / range).round() as u8;
    }
    remap(gray, &lut)
}

/// Equalize luminance through its cumulative distribution.
///
/// `v' = round((cdf(v) - cdf_min) * 255 / (n - cdf_min))` where `cdf_min` is
/// the first non-zero CDF value. Returns a gray buffer.
pub fn equalize(buffer: PixelBuffer) -> PixelBuffer {
    let gray = buffer.to_gray();
    let hist = compute_histogram(&gray);

    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (slot, &count) in cdf.iter_mut().zip(hist.luminance.iter()) {
        running += u64::from(count);
        *slot = running;
    }

    let total = running;
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        return gray;
    }

    let denom = (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    for (slot, &c) in lut.iter_mut().zip(cdf.iter()) {
        *slot = (c.saturating_sub(cdf_min) as f64 * 255.0 / denom).round() as u8;
    }
    remap(gray, &lut)
}


// ===== Property-Based Tests =====
