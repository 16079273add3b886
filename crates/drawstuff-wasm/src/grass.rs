//! Grass coverage WASM bindings.

use drawstuff_core::codec::raster::encode_png;
use drawstuff_core::grass::{analyze_grass as analyze_grass_core, GrassReport};
use drawstuff_core::{ExportError, ExportSource, Exporter};
use wasm_bindgen::prelude::*;

use crate::js_error;

/// Result of a grass analysis: the rendered mask plus its numbers.
#[wasm_bindgen]
pub struct JsGrassAnalysis {
    image: Vec<u8>,
    report: GrassReport,
}

#[wasm_bindgen]
impl JsGrassAnalysis {
    /// PNG with the dark class in white and its largest region in red.
    pub fn image(&self) -> Vec<u8> {
        self.image.clone()
    }

    /// Share of green pixels, 0-100.
    #[wasm_bindgen(getter)]
    pub fn green_percent(&self) -> f64 {
        self.report.green_percent
    }

    #[wasm_bindgen(getter)]
    pub fn threshold(&self) -> u8 {
        self.report.threshold
    }

    /// Pixel count of the largest connected dark region.
    #[wasm_bindgen(getter)]
    pub fn region_pixels(&self) -> u32 {
        u32::try_from(self.report.region_pixels).unwrap_or(u32::MAX)
    }
}

pub(crate) fn grass_of(source: &[u8], margin: u8) -> Result<JsGrassAnalysis, ExportError> {
    let buffer = Exporter::default().load(ExportSource::Encoded(source.to_vec()))?;
    let (rendered, report) = analyze_grass_core(&buffer, margin)?;
    Ok(JsGrassAnalysis {
        image: encode_png(&rendered)?,
        report,
    })
}

/// Measure grass coverage in an encoded image.
///
/// A pixel counts as green when its green channel exceeds both red and blue
/// by at least `margin`.
///
/// # Example (TypeScript)
/// ```typescript
/// const result = analyze_grass(pngBytes, 20);
/// status.textContent = `${result.green_percent.toFixed(1)}% green`;
/// preview.src = URL.createObjectURL(new Blob([result.image()]));
/// result.free();
/// ```
#[wasm_bindgen]
pub fn analyze_grass(source: &[u8], margin: u8) -> Result<JsGrassAnalysis, JsValue> {
    grass_of(source, margin).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawstuff_core::{decode, CodecLimits};

    #[test]
    fn test_grass_of() {
        // Two dark green pixels on the left, two light gray on the right
        let source = b"P3\n4 1\n255\n20 90 20 20 90 20 220 220 220 220 220 220\n";
        let result = grass_of(source, 30).unwrap();

        assert_eq!(result.green_percent(), 50.0);
        assert_eq!(result.region_pixels(), 2);

        let rendered = decode(&result.image(), &CodecLimits::default()).unwrap().buffer;
        assert_eq!(
            rendered.samples(),
            &[255, 0, 0, 255, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_grass_of_rejects_garbage() {
        assert!(matches!(grass_of(b"nope", 10), Err(ExportError::Codec(_))));
    }
}
