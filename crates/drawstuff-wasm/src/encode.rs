//! Canvas export WASM bindings.
//!
//! The browser cannot write to arbitrary paths, so the canvas export is split:
//! [`encode_canvas_image`] flattens and encodes the layers here, and the caller
//! writes the returned bytes through the File System Access API.
//!
//! # Example
//!
//! ```typescript
//! import { encode_canvas_image } from '@drawstuff/wasm';
//!
//! const layers = await Promise.all(canvases.map(toPngBytes));
//! const bytes = encode_canvas_image('ppmP6', layers, ['made with draw stuff']);
//!
//! const writable = await fileHandle.createWritable();
//! await writable.write(new Blob([bytes]));
//! await writable.close();
//! ```

use drawstuff_core::{ExportError, ExportOptions, ExportSource, Exporter, ImageFormat};
use wasm_bindgen::prelude::*;

use crate::js_error;

pub(crate) fn encode_layers(
    format: &str,
    layers: Vec<Vec<u8>>,
    comments: Vec<String>,
) -> Result<Vec<u8>, ExportError> {
    let target: ImageFormat = format.parse()?;
    let exporter = Exporter::new(ExportOptions {
        comments,
        ..ExportOptions::default()
    });
    exporter.render(ExportSource::Layers(layers), &[], target)
}

/// Flatten canvas layers bottom to top and encode them.
///
/// # Arguments
///
/// * `format` - Export format tag, see [`image_formats`]
/// * `layers` - Array of encoded layers (`Uint8Array`), bottom first
/// * `comments` - Optional comment lines for Netpbm headers
///
/// # Errors
///
/// Throws if the format is unknown, there are no layers, a layer cannot be
/// decoded, or the layers differ in size.
#[wasm_bindgen]
pub fn encode_canvas_image(
    format: &str,
    layers: js_sys::Array,
    comments: Option<Vec<String>>,
) -> Result<Vec<u8>, JsValue> {
    let layers = layers
        .iter()
        .map(|layer| js_sys::Uint8Array::new(&layer).to_vec())
        .collect();
    encode_layers(format, layers, comments.unwrap_or_default()).map_err(js_error)
}

/// Format tags accepted by the export functions.
#[wasm_bindgen]
pub fn image_formats() -> Vec<String> {
    ImageFormat::ALL
        .iter()
        .map(|format| format.tag().to_string())
        .collect()
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_encode_canvas_image_from_uint8_arrays() {
        let layer = js_sys::Uint8Array::from(&b"P3\n1 1\n255\n1 2 3\n"[..]);
        let layers = js_sys::Array::of1(&layer);
        let out = encode_canvas_image("ppmP6", layers, None).unwrap();
        assert_eq!(out, b"P6\n1 1\n255\n\x01\x02\x03");
    }

    #[wasm_bindgen_test]
    fn test_encode_canvas_image_empty() {
        assert!(encode_canvas_image("ppmP6", js_sys::Array::new(), None).is_err());
    }
}
