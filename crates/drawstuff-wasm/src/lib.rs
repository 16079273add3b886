//! Draw Stuff WASM - WebAssembly bindings for Draw Stuff
//!
//! This crate exposes the drawstuff-core codecs and transforms to the
//! JavaScript canvas front end.
//!
//! # Module Structure
//!
//! - `color` - RGB/CMYK conversion
//! - `transform` - grayscale, alpha, RGB, histogram, binarization, filter and
//!   morphology transforms
//! - `encode` - flattening canvas layers into an exportable file
//! - `histogram` - luminance histogram for the tone tools
//! - `grass` - grass coverage analysis
//!
//! Every image crosses the boundary as encoded bytes in a `Uint8Array`
//! (PNG, JPEG or Netpbm). Data-URL handling stays on the JavaScript side.
//!
//! # Usage
//!
//! ```typescript
//! import init, { apply_grayscale_transform } from '@drawstuff/wasm';
//!
//! await init();
//!
//! const png = new Uint8Array(await canvasBlob.arrayBuffer());
//! const pgm = apply_grayscale_transform(png, 'pgmP5', 'weights');
//! ```

use std::fmt::Display;

use wasm_bindgen::prelude::*;

mod color;
mod encode;
mod grass;
mod histogram;
mod transform;

pub use color::{cmyk_to_rgb, rgb_to_cmyk};
pub use encode::{encode_canvas_image, image_formats};
pub use grass::{analyze_grass, JsGrassAnalysis};
pub use histogram::{compute_histogram, JsHistogram};
pub use transform::{
    apply_alpha_transform, apply_filter, apply_grayscale_transform, apply_histogram_transform,
    apply_morphology, apply_rgb_transform, binarize_image, binarize_local_image,
};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Log an error to the browser console and turn it into a thrown value.
pub(crate) fn js_error(err: impl Display) -> JsValue {
    let message = err.to_string();
    let value = JsValue::from_str(&message);
    web_sys::console::error_1(&value);
    value
}
