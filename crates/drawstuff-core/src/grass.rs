//! Grass coverage analysis.
//!
//! Counts the share of green pixels, splits the image at its Otsu luma
//! threshold and finds the largest 4-connected dark region. The rendered
//! result shows the dark class in white, the rest in black and the largest
//! region in red.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::binarize::{threshold_for, ThresholdMethod};
use crate::buffer::{Channels, PixelBuffer};
use crate::histogram::compute_histogram;
use crate::pointwise::TransformError;

const REGION_COLOUR: [u8; 3] = [255, 0, 0];

/// Whether green exceeds both red and blue by at least `margin`.
#[inline]
pub fn is_green(r: u8, g: u8, b: u8, margin: u8) -> bool {
    let g = u16::from(g);
    g >= u16::from(r) + u16::from(margin) && g >= u16::from(b) + u16::from(margin)
}

/// Percentage (0-100) of pixels that are green by [`is_green`].
///
/// Gray buffers have no green pixels unless `margin` is 0.
pub fn green_percentage(buffer: &PixelBuffer, margin: u8) -> f64 {
    let green = match buffer.channels() {
        Channels::Gray => buffer
            .samples()
            .iter()
            .filter(|&&v| is_green(v, v, v, margin))
            .count(),
        Channels::Rgb | Channels::Rgba => buffer
            .samples()
            .chunks_exact(buffer.channels().count())
            .filter(|px| is_green(px[0], px[1], px[2], margin))
            .count(),
    };
    green as f64 * 100.0 / buffer.pixel_count() as f64
}

/// Indices (row-major) of the largest 4-connected set of `true` cells.
///
/// Ties keep the region found first in scan order. Empty when no cell is set.
pub fn largest_region(mask: &[bool], width: usize, height: usize) -> Vec<usize> {
    let mut visited = vec![false; mask.len()];
    let mut queue = VecDeque::new();
    let mut largest = Vec::new();

    for start in 0..width * height {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut region = Vec::new();

        while let Some(i) = queue.pop_front() {
            region.push(i);
            let (x, y) = (i % width, i / width);
            let neighbours = [
                (x + 1 < width).then(|| i + 1),
                (x > 0).then(|| i - 1),
                (y + 1 < height).then(|| i + width),
                (y > 0).then(|| i - width),
            ];
            for n in neighbours.into_iter().flatten() {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }

        if region.len() > largest.len() {
            largest = region;
        }
    }
    largest
}

/// Numbers behind a grass analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrassReport {
    /// Share of green pixels, 0-100.
    pub green_percent: f64,
    /// Otsu luma threshold; pixels at or below it form the dark class.
    pub threshold: u8,
    /// Pixel count of the largest connected dark region.
    pub region_pixels: usize,
}

/// Analyse `buffer` and render the dark-class mask with its largest region
/// highlighted. Returns an RGB buffer and the report.
#[instrument(
    skip_all,
    fields(width = buffer.width(), height = buffer.height(), margin = margin)
)]
pub fn analyze_grass(
    buffer: &PixelBuffer,
    margin: u8,
) -> Result<(PixelBuffer, GrassReport), TransformError> {
    let green_percent = green_percentage(buffer, margin);

    let mut mask = buffer.clone().to_gray();
    let threshold = threshold_for(&compute_histogram(&mask).luminance, ThresholdMethod::Otsu)?;
    for v in mask.samples_mut() {
        *v = if *v <= threshold { 255 } else { 0 };
    }

    let dark: Vec<bool> = mask.samples().iter().map(|&v| v == 255).collect();
    let region = largest_region(&dark, buffer.width() as usize, buffer.height() as usize);

    let mut rendered = mask.to_rgb();
    let samples = rendered.samples_mut();
    for &i in &region {
        samples[i * 3..i * 3 + 3].copy_from_slice(&REGION_COLOUR);
    }

    let report = GrassReport {
        green_percent,
        threshold,
        region_pixels: region.len(),
    };
    debug!(?report, "grass analysis");
    Ok((rendered, report))
}


// ===== Property-Based Tests =====

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the largest region is a subset of the mask with no
        /// repeated cells, and no other region is larger.
        #[test]
        fn prop_largest_region_is_maximal(bits in prop::collection::vec(any::<bool>(), 30)) {
            let region = largest_region(&bits, 6, 5);
            let mut seen = vec![false; bits.len()];
            for &i in &region {
                prop_assert!(bits[i]);
                prop_assert!(!seen[i]);
                seen[i] = true;
            }
            let set = bits.iter().filter(|&&b| b).count();
            prop_assert!(region.len() <= set);
            prop_assert_eq!(region.is_empty(), set == 0);
        }

        /// Property: the green share is a percentage.
        #[test]
        fn prop_green_percentage_in_range(
            samples in prop::collection::vec(any::<u8>(), 12),
            margin in any::<u8>(),
        ) {
            let buf = PixelBuffer::new(2, 2, Channels::Rgb, samples).unwrap();
            let pct = green_percentage(&buf, margin);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
