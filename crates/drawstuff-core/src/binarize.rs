//! Thresholding of an image into black and white.
//!
//! Every method reduces the image to BT.601 luma. The global methods pick one
//! threshold for the whole image and map `luma > threshold` to white (255),
//! everything else to black (0). The local methods derive a threshold from a
//! window around each pixel and map `luma >= threshold` to white. The result
//! is a gray buffer, ready for PBM export.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::filter::{check_window, map_windows, Border};
use crate::histogram::compute_histogram;
use crate::pointwise::TransformError;

/// Upper bound on refinement passes for [`ThresholdMethod::MeanIterative`].
pub const MAX_MEAN_ITERATIONS: u32 = 100;

/// Largest window side for the local methods.
pub const MAX_LOCAL_WINDOW: u32 = 51;

const DEFAULT_LOCAL_WINDOW: u32 = 15;
const DEFAULT_NIBLACK_K: f64 = -0.2;
const DEFAULT_BERNSEN_CONTRAST: u8 = 15;

const BLACK: u8 = 0;
const WHITE: u8 = 255;

/// How the global threshold is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ThresholdMethod {
    /// Fixed threshold.
    Manual { threshold: u8 },
    /// Threshold such that roughly `percent` of the pixels turn black.
    PercentBlack { percent: f64 },
    /// Start at the mean luma and move to the midpoint of the two class means
    /// until it settles or `max_iterations` passes have run.
    MeanIterative { max_iterations: u32 },
    /// Maximise between-class variance.
    Otsu,
}

impl ThresholdMethod {
    pub fn validate(&self) -> Result<(), TransformError> {
        match *self {
            ThresholdMethod::PercentBlack { percent } if !(0.0..=100.0).contains(&percent) => {
                Err(TransformError::invalid(
                    "percent",
                    format!("must be between 0 and 100, got {percent}"),
                ))
            }
            ThresholdMethod::MeanIterative { max_iterations }
                if max_iterations > MAX_MEAN_ITERATIONS =>
            {
                Err(TransformError::invalid(
                    "max_iterations",
                    format!("must be between 0 and {MAX_MEAN_ITERATIONS}, got {max_iterations}"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Build a method from its boundary name and optional numeric parameter.
    ///
    /// Names: `manual`, `percent-black`, `mean-iterative`, `otsu`.
    pub fn from_parts(name: &str, value: Option<f64>) -> Result<Self, TransformError> {
        let need = |param: &str| {
            value.ok_or_else(|| TransformError::invalid(param, "value is required"))
        };

        let method = match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "manual" => {
                let v = need("threshold")?;
                if !(0.0..=255.0).contains(&v) || v.fract() != 0.0 {
                    return Err(TransformError::invalid(
                        "threshold",
                        format!("must be an integer between 0 and 255, got {v}"),
                    ));
                }
                ThresholdMethod::Manual { threshold: v as u8 }
            }
            "percent-black" | "percent" => ThresholdMethod::PercentBlack {
                percent: need("percent")?,
            },
            "mean-iterative" | "iterative" => {
                let v = need("max_iterations")?;
                if v < 0.0 || v.fract() != 0.0 {
                    return Err(TransformError::invalid(
                        "max_iterations",
                        format!("must be a non-negative integer, got {v}"),
                    ));
                }
                ThresholdMethod::MeanIterative {
                    max_iterations: v.min(u32::MAX as f64) as u32,
                }
            }
            "otsu" => ThresholdMethod::Otsu,
            other => {
                return Err(TransformError::UnsupportedTransform(format!(
                    "binarization method '{other}'"
                )))
            }
        };

        method.validate()?;
        Ok(method)
    }
}

/// Pick the threshold for a luma histogram.
pub fn threshold_for(luminance: &[u32; 256], method: ThresholdMethod) -> Result<u8, TransformError> {
    method.validate()?;

    let total: u64 = luminance.iter().map(|&n| u64::from(n)).sum();
    if total == 0 {
        return Ok(match method {
            ThresholdMethod::Manual { threshold } => threshold,
            _ => 0,
        });
    }

    let threshold = match method {
        ThresholdMethod::Manual { threshold } => threshold,
        ThresholdMethod::PercentBlack { percent } => percent_black(luminance, total, percent),
        ThresholdMethod::MeanIterative { max_iterations } => {
            mean_iterative(luminance, total, max_iterations)
        }
        ThresholdMethod::Otsu => otsu(luminance, total),
    };
    Ok(threshold)
}

/// Luma of the sample at rank `floor(percent / 100 * n)` in sorted order.
fn percent_black(luminance: &[u32; 256], total: u64, percent: f64) -> u8 {
    let rank = ((percent / 100.0) * total as f64) as u64;
    let rank = rank.min(total - 1);

    let mut seen = 0u64;
    for (v, &count) in luminance.iter().enumerate() {
        seen += u64::from(count);
        if seen > rank {
            return v as u8;
        }
    }
    255
}

fn mean_iterative(luminance: &[u32; 256], total: u64, max_iterations: u32) -> u8 {
    let weighted: u64 = luminance
        .iter()
        .enumerate()
        .map(|(v, &n)| v as u64 * u64::from(n))
        .sum();
    let mut threshold = (weighted / total) as u8;

    for _ in 0..max_iterations {
        let (mut sum_low, mut count_low) = (0u64, 0u64);
        for (v, &n) in luminance.iter().enumerate().take(threshold as usize + 1) {
            sum_low += v as u64 * u64::from(n);
            count_low += u64::from(n);
        }
        let (sum_high, count_high) = (weighted - sum_low, total - count_low);

        if count_low == 0 || count_high == 0 {
            break;
        }
        let next = ((sum_low / count_low + sum_high / count_high) / 2) as u8;
        if next == threshold {
            break;
        }
        threshold = next;
    }
    threshold
}

fn otsu(luminance: &[u32; 256], total: u64) -> u8 {
    let sum_total: f64 = luminance
        .iter()
        .enumerate()
        .map(|(v, &n)| v as f64 * f64::from(n))
        .sum();

    let mut sum_back = 0.0f64;
    let mut weight_back = 0u64;
    let mut best = 0.0f64;
    let mut threshold = 0u8;

    for (t, &n) in luminance.iter().enumerate() {
        weight_back += u64::from(n);
        if weight_back == 0 {
            continue;
        }
        let weight_fore = total - weight_back;
        if weight_fore == 0 {
            break;
        }
        sum_back += t as f64 * f64::from(n);

        let mean_back = sum_back / weight_back as f64;
        let mean_fore = (sum_total - sum_back) / weight_fore as f64;
        let variance =
            weight_back as f64 * weight_fore as f64 * (mean_back - mean_fore).powi(2);
        if variance > best {
            best = variance;
            threshold = t as u8;
        }
    }
    threshold
}

/// Threshold `buffer` into a black and white gray buffer.
pub fn binarize(buffer: PixelBuffer, method: ThresholdMethod) -> Result<PixelBuffer, TransformError> {
    let mut gray = buffer.to_gray();
    let threshold = threshold_for(&compute_histogram(&gray).luminance, method)?;
    debug!(?method, threshold, "binarizing");

    for v in gray.samples_mut() {
        *v = if *v > threshold { WHITE } else { BLACK };
    }
    Ok(gray)
}

/// Per-pixel threshold taken from the window around each pixel.
///
/// Windows shrink at the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum LocalMethod {
    /// `mean + k * stddev` of the window luma.
    Niblack { window: u32, k: f64 },
    /// Midpoint of the window's darkest and brightest luma. Windows whose
    /// contrast is below `contrast` are treated as background and turn white.
    Bernsen { window: u32, contrast: u8 },
}

impl LocalMethod {
    fn radius(&self) -> Result<u32, TransformError> {
        match *self {
            LocalMethod::Niblack { window, k } => {
                if !k.is_finite() {
                    return Err(TransformError::invalid("k", format!("must be finite, got {k}")));
                }
                check_window("window", window, MAX_LOCAL_WINDOW)
            }
            LocalMethod::Bernsen { window, .. } => {
                check_window("window", window, MAX_LOCAL_WINDOW)
            }
        }
    }

    /// Build a method from its boundary name, window side and parameter
    /// (`k` for Niblack, the contrast threshold for Bernsen).
    pub fn from_parts(
        name: &str,
        window: Option<f64>,
        param: Option<f64>,
    ) -> Result<Self, TransformError> {
        let window = match window {
            None => DEFAULT_LOCAL_WINDOW,
            Some(v) if v.fract() == 0.0 && (0.0..=f64::from(MAX_LOCAL_WINDOW)).contains(&v) => {
                v as u32
            }
            Some(v) => {
                return Err(TransformError::invalid(
                    "window",
                    format!("must be an odd integer between 3 and {MAX_LOCAL_WINDOW}, got {v}"),
                ))
            }
        };

        let method = match name.trim().to_ascii_lowercase().as_str() {
            "niblack" => LocalMethod::Niblack {
                window,
                k: param.unwrap_or(DEFAULT_NIBLACK_K),
            },
            "bernsen" => {
                let contrast = match param {
                    None => DEFAULT_BERNSEN_CONTRAST,
                    Some(v) if v.fract() == 0.0 && (0.0..=255.0).contains(&v) => v as u8,
                    Some(v) => {
                        return Err(TransformError::invalid(
                            "contrast",
                            format!("must be an integer between 0 and 255, got {v}"),
                        ))
                    }
                };
                LocalMethod::Bernsen { window, contrast }
            }
            other => {
                return Err(TransformError::UnsupportedTransform(format!(
                    "local binarization method '{other}'"
                )))
            }
        };

        method.radius()?;
        Ok(method)
    }
}

fn niblack(values: impl Iterator<Item = u8>, centre: u8, k: f64) -> u8 {
    let (mut sum, mut sum_sq, mut count) = (0.0f64, 0.0f64, 0u32);
    for v in values {
        let v = f64::from(v);
        sum += v;
        sum_sq += v * v;
        count += 1;
    }
    let mean = sum / f64::from(count);
    let variance = (sum_sq / f64::from(count) - mean * mean).max(0.0);
    let threshold = mean + k * variance.sqrt();
    if f64::from(centre) >= threshold {
        WHITE
    } else {
        BLACK
    }
}

fn bernsen(values: impl Iterator<Item = u8>, centre: u8, contrast: u8) -> u8 {
    let (lo, hi) = values.fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo < contrast {
        return WHITE;
    }
    if centre >= lo / 2 + hi / 2 {
        WHITE
    } else {
        BLACK
    }
}

/// Threshold `buffer` with a per-pixel local method.
pub fn binarize_local(buffer: PixelBuffer, method: LocalMethod) -> Result<PixelBuffer, TransformError> {
    let radius = method.radius()?;
    debug!(?method, "binarizing locally");

    let gray = buffer.to_gray();
    Ok(map_windows(&gray, radius, Border::Shrink, |taps| {
        let centre = taps
            .iter()
            .find(|t| t.dx == 0 && t.dy == 0)
            .map_or(0, |t| t.value);
        let values = taps.iter().map(|t| t.value);
        match method {
            LocalMethod::Niblack { k, .. } => niblack(values, centre, k),
            LocalMethod::Bernsen { contrast, .. } => bernsen(values, centre, contrast),
        }
    }))
}


// ===== Property-Based Tests =====

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::buffer::Channels;
    use proptest::prelude::*;

    fn method() -> impl Strategy<Value = ThresholdMethod> {
        prop_oneof![
            any::<u8>().prop_map(|threshold| ThresholdMethod::Manual { threshold }),
            (0.0f64..=100.0).prop_map(|percent| ThresholdMethod::PercentBlack { percent }),
            (0u32..=100).prop_map(|max_iterations| ThresholdMethod::MeanIterative { max_iterations }),
            Just(ThresholdMethod::Otsu),
        ]
    }

    proptest! {
        /// Property: output is gray, same size, and holds only 0 and 255.
        #[test]
        fn prop_output_is_binary(
            samples in prop::collection::vec(any::<u8>(), 1..300),
            method in method(),
        ) {
            let width = samples.len() as u32;
            let buf = PixelBuffer::new(width, 1, Channels::Gray, samples).unwrap();
            let out = binarize(buf, method).unwrap();
            prop_assert_eq!(out.channels(), Channels::Gray);
            prop_assert_eq!(out.width(), width);
            prop_assert!(out.samples().iter().all(|&v| v == 0 || v == 255));
        }

        /// Property: local methods also produce a binary gray image.
        #[test]
        fn prop_local_output_is_binary(
            samples in prop::collection::vec(any::<u8>(), 12),
            window in prop_oneof![Just(3u32), Just(5u32)],
            k in -1.0f64..1.0,
            contrast in any::<u8>(),
            niblack in any::<bool>(),
        ) {
            let method = if niblack {
                LocalMethod::Niblack { window, k }
            } else {
                LocalMethod::Bernsen { window, contrast }
            };
            let buf = PixelBuffer::new(4, 3, Channels::Gray, samples).unwrap();
            let out = binarize_local(buf, method).unwrap();
            prop_assert_eq!((out.width(), out.height()), (4, 3));
            prop_assert!(out.samples().iter().all(|&v| v == 0 || v == 255));
        }

        /// Property: a brighter input pixel is never blacker in the output.
        #[test]
        fn prop_monotone(
            samples in prop::collection::vec(any::<u8>(), 2..100),
            method in method(),
        ) {
            let width = samples.len() as u32;
            let buf = PixelBuffer::new(width, 1, Channels::Gray, samples.clone()).unwrap();
            let out = binarize(buf, method).unwrap();
            for (i, a) in samples.iter().enumerate() {
                for (j, b) in samples.iter().enumerate() {
                    if a < b {
                        prop_assert!(out.samples()[i] <= out.samples()[j]);
                    }
                }
            }
        }
    }
}
