//! Neighbourhood filters: mean, median, Gaussian blur and Sobel edges.
//!
//! Each output sample is computed from a square window centred on the input
//! sample. How the window behaves at the image edge is chosen with [`Border`].
//! Colour filters keep the buffer layout and leave alpha untouched; Sobel
//! returns a gray edge-magnitude buffer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::{Channels, PixelBuffer};
use crate::pointwise::TransformError;

/// Largest accepted window side.
pub const MAX_WINDOW: u32 = 15;

/// Window side used when the caller gives none.
pub const DEFAULT_WINDOW: u32 = 3;

/// Treatment of window positions that fall outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Border {
    /// Only in-bounds neighbours take part; the window shrinks at the edges.
    Shrink,
    /// Out-of-bounds positions read the nearest edge pixel.
    Replicate,
}

impl Border {
    /// Map a possibly out-of-bounds position onto the pixel it reads.
    #[inline]
    pub(crate) fn locate(self, x: i64, y: i64, width: usize, height: usize) -> Option<(usize, usize)> {
        let (w, h) = (width as i64, height as i64);
        match self {
            Border::Shrink => {
                ((0..w).contains(&x) && (0..h).contains(&y)).then_some((x as usize, y as usize))
            }
            Border::Replicate => Some((x.clamp(0, w - 1) as usize, y.clamp(0, h - 1) as usize)),
        }
    }
}

impl FromStr for Border {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shrink" | "crop" => Ok(Border::Shrink),
            "replicate" | "clamp" | "edge" => Ok(Border::Replicate),
            other => Err(TransformError::invalid(
                "border",
                format!("expected 'shrink' or 'replicate', got '{other}'"),
            )),
        }
    }
}

/// One window position that landed on a pixel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tap {
    pub dx: i32,
    pub dy: i32,
    pub value: u8,
}

/// Radius of a window side validated as odd and in `3..=max`.
pub(crate) fn check_window(name: &str, size: u32, max: u32) -> Result<u32, TransformError> {
    if size < 3 || size > max || size % 2 == 0 {
        return Err(TransformError::invalid(
            name,
            format!("must be odd and between 3 and {max}, got {size}"),
        ));
    }
    Ok(size / 2)
}

/// Replace every colour sample with `reduce` of its `(2r+1)^2` window.
///
/// Alpha samples are copied unchanged. `reduce` always sees at least the
/// centre tap.
pub(crate) fn map_windows<F>(src: &PixelBuffer, radius: u32, border: Border, reduce: F) -> PixelBuffer
where
    F: Fn(&mut [Tap]) -> u8 + Send + Sync,
{
    let width = src.width() as usize;
    let height = src.height() as usize;
    let n = src.channels().count();
    let colour = match src.channels() {
        Channels::Rgba => 3,
        other => other.count(),
    };
    let r = i64::from(radius);
    let side = 2 * radius as usize + 1;
    let samples = src.samples();

    let fill_row = |(y, row): (usize, &mut [u8])| {
        let mut taps = Vec::with_capacity(side * side);
        for x in 0..width {
            for c in 0..colour {
                taps.clear();
                for dy in -r..=r {
                    for dx in -r..=r {
                        if let Some((nx, ny)) =
                            border.locate(x as i64 + dx, y as i64 + dy, width, height)
                        {
                            taps.push(Tap {
                                dx: dx as i32,
                                dy: dy as i32,
                                value: samples[(ny * width + nx) * n + c],
                            });
                        }
                    }
                }
                row[x * n + c] = reduce(&mut taps);
            }
        }
    };

    let mut out = src.clone();
    let stride = out.row_stride();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.samples_mut()
            .par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(fill_row);
    }

    #[cfg(not(feature = "parallel"))]
    out.samples_mut()
        .chunks_exact_mut(stride)
        .enumerate()
        .for_each(fill_row);

    out
}

/// A neighbourhood filter and its window side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "camelCase")]
pub enum Filter {
    /// Arithmetic mean of the window, truncated.
    Mean { size: u32 },
    /// Middle value of the sorted window (upper middle for even counts).
    Median { size: u32 },
    /// Binomial approximation of a Gaussian; size 3 is the 1-2-1 kernel.
    Gaussian { size: u32 },
    /// 3x3 Sobel gradient magnitude of luma, clamped to 255.
    Sobel,
}

impl Filter {
    /// Border used when the caller does not pick one: averaging filters
    /// shrink their window, weighted kernels replicate the edge.
    pub fn default_border(&self) -> Border {
        match self {
            Filter::Mean { .. } | Filter::Median { .. } => Border::Shrink,
            Filter::Gaussian { .. } | Filter::Sobel => Border::Replicate,
        }
    }

    fn radius(&self) -> Result<u32, TransformError> {
        match *self {
            Filter::Mean { size } | Filter::Median { size } | Filter::Gaussian { size } => {
                check_window("size", size, MAX_WINDOW)
            }
            Filter::Sobel => Ok(1),
        }
    }

    /// Build a filter from its boundary name and optional window side.
    ///
    /// Names: `mean` (or `average`), `median`, `gaussian`, `sobel`.
    pub fn from_parts(name: &str, size: Option<f64>) -> Result<Self, TransformError> {
        let size = match size {
            None => DEFAULT_WINDOW,
            Some(v) if v.fract() == 0.0 && (0.0..=f64::from(MAX_WINDOW)).contains(&v) => v as u32,
            Some(v) => {
                return Err(TransformError::invalid(
                    "size",
                    format!("must be an odd integer between 3 and {MAX_WINDOW}, got {v}"),
                ))
            }
        };

        let filter = match name.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" | "box" => Filter::Mean { size },
            "median" => Filter::Median { size },
            "gaussian" | "gauss" => Filter::Gaussian { size },
            "sobel" => Filter::Sobel,
            other => {
                return Err(TransformError::UnsupportedTransform(format!(
                    "filter '{other}'"
                )))
            }
        };
        filter.radius()?;
        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Mean { size } => write!(f, "mean {size}x{size}"),
            Filter::Median { size } => write!(f, "median {size}x{size}"),
            Filter::Gaussian { size } => write!(f, "gaussian {size}x{size}"),
            Filter::Sobel => f.write_str("sobel"),
        }
    }
}

/// Row `n` of Pascal's triangle.
fn binomial_row(n: u32) -> Vec<u64> {
    let mut row = vec![1u64];
    for k in 0..n {
        let next = row[k as usize] * u64::from(n - k) / u64::from(k + 1);
        row.push(next);
    }
    row
}

fn mean(taps: &mut [Tap]) -> u8 {
    let sum: u32 = taps.iter().map(|t| u32::from(t.value)).sum();
    (sum / taps.len() as u32) as u8
}

fn median(taps: &mut [Tap]) -> u8 {
    taps.sort_unstable_by_key(|t| t.value);
    taps[taps.len() / 2].value
}

#[rustfmt::skip]
fn sobel(taps: &mut [Tap]) -> u8 {
    // Gx            Gy
    // -1  0  1      -1 -2 -1
    // -2  0  2       0  0  0
    // -1  0  1       1  2  1
    let (mut gx, mut gy) = (0i32, 0i32);
    for t in taps.iter() {
        let v = i32::from(t.value);
        let cross = if t.dx == 0 || t.dy == 0 { 2 } else { 1 };
        gx += t.dx * cross * v;
        gy += t.dy * cross * v;
    }
    (f64::from(gx * gx + gy * gy).sqrt().min(255.0)) as u8
}

/// Run `filter` over `buffer` with the given border treatment.
pub fn apply_filter(
    buffer: PixelBuffer,
    filter: Filter,
    border: Border,
) -> Result<PixelBuffer, TransformError> {
    let radius = filter.radius()?;
    debug!(%filter, ?border, width = buffer.width(), height = buffer.height(), "filtering");

    let out = match filter {
        Filter::Mean { .. } => map_windows(&buffer, radius, border, mean),
        Filter::Median { .. } => map_windows(&buffer, radius, border, median),
        Filter::Gaussian { size } => {
            let weights = binomial_row(size - 1);
            let r = radius as i32;
            map_windows(&buffer, radius, border, |taps| {
                let (mut sum, mut total) = (0u64, 0u64);
                for t in taps.iter() {
                    let w = weights[(t.dx + r) as usize] * weights[(t.dy + r) as usize];
                    sum += w * u64::from(t.value);
                    total += w;
                }
                (sum / total) as u8
            })
        }
        Filter::Sobel => map_windows(&buffer.to_gray(), radius, border, sobel),
    };
    Ok(out)
}


// ===== Property-Based Tests =====
