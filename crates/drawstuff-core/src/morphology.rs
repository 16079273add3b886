//! Gray-scale morphology: dilation, erosion, opening and closing.
//!
//! The image is reduced to BT.601 luma first, so a binarized image stays
//! binary. Windows shrink at the image edge: positions outside the image are
//! ignored, which acts like black padding for dilation and white padding for
//! erosion.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::filter::{check_window, map_windows, Border, Tap, MAX_WINDOW};
use crate::pointwise::TransformError;

/// Shape of the structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    /// Centre row and centre column of the window.
    #[default]
    Cross,
    /// Every position of the window.
    Square,
}

impl Shape {
    #[inline]
    fn contains(self, tap: &Tap) -> bool {
        match self {
            Shape::Cross => tap.dx == 0 || tap.dy == 0,
            Shape::Square => true,
        }
    }
}

impl FromStr for Shape {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cross" | "plus" => Ok(Shape::Cross),
            "square" | "box" => Ok(Shape::Square),
            other => Err(TransformError::invalid(
                "shape",
                format!("expected 'cross' or 'square', got '{other}'"),
            )),
        }
    }
}

/// Structuring element: a shape inside an odd `size` x `size` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringElement {
    pub shape: Shape,
    pub size: u32,
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self {
            shape: Shape::Cross,
            size: 3,
        }
    }
}

impl StructuringElement {
    /// Build an element from the boundary's optional shape name and size.
    pub fn from_parts(shape: Option<&str>, size: Option<f64>) -> Result<Self, TransformError> {
        let mut element = Self::default();
        if let Some(name) = shape {
            element.shape = name.parse()?;
        }
        if let Some(v) = size {
            if v.fract() != 0.0 || !(0.0..=f64::from(MAX_WINDOW)).contains(&v) {
                return Err(TransformError::invalid(
                    "size",
                    format!("must be an odd integer between 3 and {MAX_WINDOW}, got {v}"),
                ));
            }
            element.size = v as u32;
        }
        check_window("size", element.size, MAX_WINDOW)?;
        Ok(element)
    }
}

/// Morphological operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MorphOp {
    /// Maximum over the element.
    Dilate,
    /// Minimum over the element.
    Erode,
    /// Erosion followed by dilation; removes small bright specks.
    Open,
    /// Dilation followed by erosion; fills small dark holes.
    Close,
}

impl FromStr for MorphOp {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dilate" | "dilation" => Ok(MorphOp::Dilate),
            "erode" | "erosion" => Ok(MorphOp::Erode),
            "open" | "opening" => Ok(MorphOp::Open),
            "close" | "closing" => Ok(MorphOp::Close),
            other => Err(TransformError::UnsupportedTransform(format!(
                "morphological operation '{other}'"
            ))),
        }
    }
}

fn extreme(gray: &PixelBuffer, radius: u32, shape: Shape, max: bool) -> PixelBuffer {
    map_windows(gray, radius, Border::Shrink, |taps| {
        let values = taps.iter().filter(|t| shape.contains(t)).map(|t| t.value);
        let picked = if max { values.max() } else { values.min() };
        // The centre tap is in every shape
        picked.unwrap_or(0)
    })
}

/// Apply `op` with `element` to the luma of `buffer`. Returns a gray buffer.
pub fn morphology(
    buffer: PixelBuffer,
    op: MorphOp,
    element: StructuringElement,
) -> Result<PixelBuffer, TransformError> {
    let radius = check_window("size", element.size, MAX_WINDOW)?;
    debug!(?op, shape = ?element.shape, size = element.size, "morphology");

    let gray = buffer.to_gray();
    let shape = element.shape;
    let out = match op {
        MorphOp::Dilate => extreme(&gray, radius, shape, true),
        MorphOp::Erode => extreme(&gray, radius, shape, false),
        MorphOp::Open => extreme(&extreme(&gray, radius, shape, false), radius, shape, true),
        MorphOp::Close => extreme(&extreme(&gray, radius, shape, true), radius, shape, false),
    };
    Ok(out)
}

pub fn dilate(buffer: PixelBuffer, element: StructuringElement) -> Result<PixelBuffer, TransformError> {
    morphology(buffer, MorphOp::Dilate, element)
}

pub fn erode(buffer: PixelBuffer, element: StructuringElement) -> Result<PixelBuffer, TransformError> {
    morphology(buffer, MorphOp::Erode, element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Channels;

    fn gray(width: u32, samples: Vec<u8>) -> PixelBuffer {
        let height = samples.len() as u32 / width;
        PixelBuffer::new(width, height, Channels::Gray, samples).unwrap()
    }

    fn dot() -> PixelBuffer {
        gray(3, vec![0, 0, 0, 0, 255, 0, 0, 0, 0])
    }

    const PLUS: [u8; 9] = [0, 255, 0, 255, 255, 255, 0, 255, 0];

    #[test]
    fn test_dilate_cross() {
        let out = dilate(dot(), StructuringElement::default()).unwrap();
        assert_eq!(out.samples(), &PLUS);
    }

    #[test]
    fn test_dilate_square() {
        let element = StructuringElement {
            shape: Shape::Square,
            size: 3,
        };
        let out = dilate(dot(), element).unwrap();
        assert!(out.samples().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_erode_cross() {
        let out = erode(gray(3, PLUS.to_vec()), StructuringElement::default()).unwrap();
        assert_eq!(out.samples(), &[0, 0, 0, 0, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_edges_are_not_padding() {
        // A white image stays white under erosion: outside positions are ignored
        let white = PixelBuffer::filled(4, 3, Channels::Gray, 255).unwrap();
        let out = erode(white.clone(), StructuringElement::default()).unwrap();
        assert_eq!(out, white);
    }

    #[test]
    fn test_open_removes_speck_close_fills_hole() {
        let open = morphology(dot(), MorphOp::Open, StructuringElement::default()).unwrap();
        assert!(open.samples().iter().all(|&v| v == 0));

        let mut hole = vec![255u8; 25];
        hole[12] = 0;
        let close = morphology(gray(5, hole), MorphOp::Close, StructuringElement::default()).unwrap();
        assert!(close.samples().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_rgb_input_reduced_to_luma() {
        // luma(255, 0, 0) = 76
        let buf = PixelBuffer::new(2, 1, Channels::Rgb, vec![255, 0, 0, 0, 0, 0]).unwrap();
        let out = dilate(buf, StructuringElement::default()).unwrap();
        assert_eq!(out.channels(), Channels::Gray);
        assert_eq!(out.samples(), &[76, 76]);
    }

    #[test]
    fn test_invalid_element_and_names() {
        let element = StructuringElement {
            shape: Shape::Cross,
            size: 4,
        };
        assert!(matches!(
            dilate(dot(), element),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert_eq!("erosion".parse::<MorphOp>().unwrap(), MorphOp::Erode);
        assert_eq!("PLUS".parse::<Shape>().unwrap(), Shape::Cross);
        assert!("skeleton".parse::<MorphOp>().is_err());
        assert!("disk".parse::<Shape>().is_err());
    }

    #[test]
    fn test_element_from_parts() {
        assert_eq!(
            StructuringElement::from_parts(None, None).unwrap(),
            StructuringElement::default()
        );
        assert_eq!(
            StructuringElement::from_parts(Some("square"), Some(5.0)).unwrap(),
            StructuringElement {
                shape: Shape::Square,
                size: 5
            }
        );
        assert!(StructuringElement::from_parts(None, Some(2.0)).is_err());
        assert!(StructuringElement::from_parts(None, Some(3.5)).is_err());
        assert!(StructuringElement::from_parts(Some("ring"), None).is_err());
    }
}

// ===== Property-Based Tests =====
