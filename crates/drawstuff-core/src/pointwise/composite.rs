//! Porter-Duff source-over for flattening canvas layers.

use super::TransformError;
use crate::buffer::PixelBuffer;

/// Draw `top` over `bottom` with straight (non-premultiplied) alpha.
///
/// Both inputs are widened to RGBA; the result is RGBA.
///
/// # Errors
///
/// Returns [`TransformError::DimensionMismatch`] if the two buffers differ in
/// width or height.
pub fn composite_over(bottom: PixelBuffer, top: &PixelBuffer) -> Result<PixelBuffer, TransformError> {
    if (bottom.width(), bottom.height()) != (top.width(), top.height()) {
        return Err(TransformError::DimensionMismatch {
            expected: (bottom.width(), bottom.height()),
            found: (top.width(), top.height()),
        });
    }

    let mut out = bottom.to_rgba();
    let top = top.clone().to_rgba();

    for (dst, src) in out
        .samples_mut()
        .chunks_exact_mut(4)
        .zip(top.samples().chunks_exact(4))
    {
        blend_pixel(dst, src);
    }
    Ok(out)
}

#[inline]
fn blend_pixel(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        dst.copy_from_slice(src);
        return;
    }
    if sa <= 0.0 {
        return;
    }

    let da = dst[3] as f32 / 255.0;
    let oa = sa + da * (1.0 - sa);
    if oa <= 0.0 {
        dst.fill(0);
        return;
    }

    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / oa;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Channels;

    fn px(r: u8, g: u8, b: u8, a: u8) -> PixelBuffer {
        PixelBuffer::new(1, 1, Channels::Rgba, vec![r, g, b, a]).unwrap()
    }

    #[test]
    fn test_opaque_top_wins() {
        let out = composite_over(px(1, 2, 3, 255), &px(9, 8, 7, 255)).unwrap();
        assert_eq!(out.samples(), &[9, 8, 7, 255]);
    }

    #[test]
    fn test_transparent_top_keeps_bottom() {
        let out = composite_over(px(1, 2, 3, 200), &px(9, 8, 7, 0)).unwrap();
        assert_eq!(out.samples(), &[1, 2, 3, 200]);
    }

    #[test]
    fn test_half_over_opaque() {
        // 255 * 128/255 + 0 * (1 - 128/255) = 128
        let out = composite_over(px(0, 0, 0, 255), &px(255, 255, 255, 128)).unwrap();
        assert_eq!(out.samples(), &[128, 128, 128, 255]);
    }

    #[test]
    fn test_half_over_transparent() {
        // Nothing underneath: the colour is the top's, alpha is the top's
        let out = composite_over(px(0, 0, 0, 0), &px(200, 100, 50, 128)).unwrap();
        assert_eq!(out.samples(), &[200, 100, 50, 128]);
    }

    #[test]
    fn test_widens_rgb_bottom() {
        let bottom = PixelBuffer::new(1, 1, Channels::Rgb, vec![10, 20, 30]).unwrap();
        let out = composite_over(bottom, &px(0, 0, 0, 0)).unwrap();
        assert_eq!(out.channels(), Channels::Rgba);
        assert_eq!(out.samples(), &[10, 20, 30, 255]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let bottom = PixelBuffer::filled(2, 2, Channels::Rgba, 0).unwrap();
        let top = PixelBuffer::filled(2, 3, Channels::Rgba, 0).unwrap();
        assert_eq!(
            composite_over(bottom, &top).unwrap_err(),
            TransformError::DimensionMismatch {
                expected: (2, 2),
                found: (2, 3)
            }
        );
    }
}
