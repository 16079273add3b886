//! RGB/CMYK conversion bindings.
//!
//! Both functions return plain objects (`{ c, m, y, k }` and `{ r, g, b }`)
//! and throw a string when a component is out of range.

use drawstuff_core::color;
use wasm_bindgen::prelude::*;

use crate::js_error;

/// Convert RGB (0-255 each) to CMYK percentages (0-100 each).
///
/// # Example (TypeScript)
/// ```typescript
/// const { c, m, y, k } = rgb_to_cmyk(255, 0, 0); // { c: 0, m: 100, y: 100, k: 0 }
/// ```
#[wasm_bindgen]
pub fn rgb_to_cmyk(r: i32, g: i32, b: i32) -> Result<JsValue, JsValue> {
    let cmyk = color::rgb_to_cmyk(r, g, b).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&cmyk).map_err(js_error)
}

/// Convert CMYK percentages (0-100 each) to RGB (0-255 each).
#[wasm_bindgen]
pub fn cmyk_to_rgb(c: i32, m: i32, y: i32, k: i32) -> Result<JsValue, JsValue> {
    let rgb = color::cmyk_to_rgb(c, m, y, k).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&rgb).map_err(js_error)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use drawstuff_core::{Cmyk, Rgb};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_rgb_to_cmyk_object() {
        let value = rgb_to_cmyk(255, 0, 0).unwrap();
        let cmyk: Cmyk = serde_wasm_bindgen::from_value(value).unwrap();
        assert_eq!(cmyk, Cmyk::new(0, 100, 100, 0).unwrap());
    }

    #[wasm_bindgen_test]
    fn test_cmyk_to_rgb_object() {
        let value = cmyk_to_rgb(0, 0, 0, 100).unwrap();
        let rgb: Rgb = serde_wasm_bindgen::from_value(value).unwrap();
        assert_eq!(rgb, Rgb::new(0, 0, 0));
    }

    #[wasm_bindgen_test]
    fn test_out_of_range_throws() {
        assert!(rgb_to_cmyk(256, 0, 0).is_err());
        assert!(cmyk_to_rgb(0, 0, 0, 101).is_err());
        assert!(cmyk_to_rgb(-1, 0, 0, 0).is_err());
    }
}
