//! Histogram WASM bindings.
//!
//! The stretch and equalize tools both work on luminance, so the panel that
//! previews them only needs the luminance bins and the range stretch maps.

use drawstuff_core::histogram::{compute_histogram as compute_histogram_core, Histogram};
use drawstuff_core::{ExportError, ExportSource, Exporter};
use wasm_bindgen::prelude::*;

use crate::js_error;

/// Luminance histogram of an image, readable from JavaScript.
#[wasm_bindgen]
pub struct JsHistogram {
    luminance: Vec<u32>,
    peak: u32,
    range: Option<(u8, u8)>,
}

#[wasm_bindgen]
impl JsHistogram {
    /// BT.601 luminance histogram (256 bins).
    pub fn luminance(&self) -> Vec<u32> {
        self.luminance.clone()
    }

    /// Largest bin, for scaling the chart.
    #[wasm_bindgen(getter)]
    pub fn peak(&self) -> u32 {
        self.peak
    }

    /// Darkest luma present, `undefined` for an empty image.
    #[wasm_bindgen(getter)]
    pub fn darkest(&self) -> Option<u8> {
        self.range.map(|(low, _)| low)
    }

    /// Brightest luma present, `undefined` for an empty image.
    #[wasm_bindgen(getter)]
    pub fn brightest(&self) -> Option<u8> {
        self.range.map(|(_, high)| high)
    }
}

impl From<Histogram> for JsHistogram {
    fn from(hist: Histogram) -> Self {
        JsHistogram {
            peak: hist.peak(),
            range: hist.luminance_range(),
            luminance: hist.luminance.to_vec(),
        }
    }
}

pub(crate) fn histogram_of(source: &[u8]) -> Result<JsHistogram, ExportError> {
    let buffer = Exporter::default().load(ExportSource::Encoded(source.to_vec()))?;
    Ok(compute_histogram_core(&buffer).into())
}

/// Compute the luminance histogram of an encoded image.
///
/// # Example (TypeScript)
/// ```typescript
/// const hist = compute_histogram(pngBytes);
///
/// const bins = hist.luminance();     // Uint32Array[256]
/// drawBars(bins, hist.peak);
/// showRange(hist.darkest, hist.brightest);
///
/// hist.free();
/// ```
#[wasm_bindgen]
pub fn compute_histogram(source: &[u8]) -> Result<JsHistogram, JsValue> {
    histogram_of(source).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_histogram_primaries() {
        let hist = histogram_of(b"P3\n3 1\n255\n255 0 0 0 255 0 0 0 255\n").unwrap();

        assert_eq!(hist.luminance().len(), 256);
        assert_eq!(hist.luminance()[76], 1);
        assert_eq!(hist.luminance()[150], 1);
        assert_eq!(hist.luminance()[29], 1);
        assert_eq!(hist.darkest(), Some(29));
        assert_eq!(hist.brightest(), Some(150));
    }

    #[test]
    fn test_js_histogram_peak() {
        let hist = histogram_of(b"P2\n4 1\n255\n128 128 128 200\n").unwrap();

        assert_eq!(hist.peak(), 3);
        assert_eq!(hist.luminance()[128], 3);
        assert_eq!(hist.luminance()[200], 1);
        assert_eq!((hist.darkest(), hist.brightest()), (Some(128), Some(200)));
    }

    #[test]
    fn test_js_histogram_rejects_garbage() {
        assert!(histogram_of(b"P9 nonsense").is_err());
    }
}
