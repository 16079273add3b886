//! Draw Stuff Core - Image codecs and pixel transforms
//!
//! This crate provides the image-side functionality behind the Draw Stuff
//! canvas: RGB/CMYK colour conversion, point-wise transforms, the Netpbm
//! family of codecs (plus JPEG and PNG through `image`), histogram tools,
//! binarization, neighbourhood filters, morphology, grass coverage analysis
//! and the export pipeline that ties them together.

pub mod binarize;
pub mod buffer;
pub mod codec;
pub mod color;
pub mod export;
pub mod filter;
pub mod grass;
pub mod histogram;
pub mod luminance;
pub mod morphology;
pub mod pointwise;

pub use binarize::{binarize, binarize_local, LocalMethod, ThresholdMethod};
pub use buffer::{BufferError, Channels, PixelBuffer};
pub use codec::{decode, encode, CodecError, CodecLimits, Decoded, EncodeOptions, ImageFormat};
pub use color::{cmyk_to_rgb, rgb_to_cmyk, Cmyk, ColorError, Rgb};
pub use export::{
    save_canvas_image, ExportError, ExportOptions, ExportRequest, ExportSource, ExportSummary,
    Exporter,
};
pub use filter::{apply_filter, Border, Filter};
pub use grass::{analyze_grass, green_percentage, largest_region, GrassReport};
pub use histogram::{compute_histogram, equalize, stretch, Histogram, HistogramMode};
pub use morphology::{dilate, erode, morphology, MorphOp, Shape, StructuringElement};
pub use pointwise::{
    apply_transform, apply_transforms, AlphaMode, AlphaSpec, GrayscaleMethod, RgbAdjustment,
    TransformError, TransformSpec,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netpbm_grayscale_pipeline() {
        let source = b"P3\n2 1\n255\n255 0 0 0 0 255\n";
        let decoded = decode(source, &CodecLimits::default()).unwrap();

        let gray = apply_transforms(
            decoded.buffer,
            &[TransformSpec::Grayscale(GrayscaleMethod::Weighted)],
        )
        .unwrap();

        let out = encode(&gray, ImageFormat::PgmP2, &EncodeOptions::default()).unwrap();
        assert_eq!(out, b"P2\n2 1\n255\n76 29\n");
    }

    #[test]
    fn test_binarized_image_exports_as_bitmap() {
        let buffer = PixelBuffer::new(4, 1, Channels::Gray, vec![10, 20, 200, 210]).unwrap();
        let bw = binarize(buffer, ThresholdMethod::Otsu).unwrap();

        let out = encode(&bw, ImageFormat::PbmP1, &EncodeOptions::default()).unwrap();
        assert_eq!(out, b"P1\n4 1\n1 1 0 0\n");
    }

    #[test]
    fn test_cleanup_pipeline_exports_as_bitmap() {
        // A speck on a white page: median removes it before thresholding
        let mut samples = vec![250u8; 25];
        samples[12] = 5;
        let page = PixelBuffer::new(5, 5, Channels::Gray, samples).unwrap();

        let smooth = apply_filter(page, Filter::Median { size: 3 }, Border::Shrink).unwrap();
        let bw = binarize(smooth, ThresholdMethod::Manual { threshold: 128 }).unwrap();
        let closed = morphology(bw, MorphOp::Close, StructuringElement::default()).unwrap();

        let out = encode(&closed, ImageFormat::PbmP4, &EncodeOptions::default()).unwrap();
        assert_eq!(&out[..7], b"P4\n5 5\n");
        assert!(out[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_color_round_trip_primaries() {
        let cmyk = rgb_to_cmyk(255, 0, 0).unwrap();
        assert_eq!(cmyk, Cmyk::new(0, 100, 100, 0).unwrap());
        assert_eq!(cmyk_to_rgb(0, 100, 100, 0).unwrap(), Rgb::new(255, 0, 0));
    }
}
