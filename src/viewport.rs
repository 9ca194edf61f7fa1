//! Canvas sizing from a product's physical aspect ratio.

use crate::config::CanvasBounds;
use crate::error::{EngineError, Result};
use crate::geometry::{CanvasDimensions, ProductArea, SizeF};

/// Computes the canvas pixel size for an aspect ratio inside a container.
///
/// The canvas is the largest rectangle of the requested aspect ratio that
/// fits the container, then each side is clamped into `bounds` on its own.
/// At extreme ratios the clamp can distort the pixel aspect ratio; print
/// math downstream works from the clamped canvas, so the distortion is
/// kept.
///
/// ```
/// use print_placement::{compute_canvas_size, CanvasBounds, SizeF};
///
/// let canvas = compute_canvas_size(SizeF::new(600.0, 600.0), 1.0, CanvasBounds::default()).unwrap();
/// assert_eq!((canvas.width, canvas.height), (600, 600));
/// ```
pub fn compute_canvas_size(
    container: SizeF,
    aspect_ratio: f64,
    bounds: CanvasBounds,
) -> Result<CanvasDimensions> {
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        return Err(EngineError::degenerate(format!("aspect ratio {aspect_ratio}")));
    }
    let container = container.sanitized();

    let (width, height) = if aspect_ratio >= 1.0 {
        let width = container.width.min(container.height * aspect_ratio);
        (width, width / aspect_ratio)
    } else {
        let height = container.height.min(container.width / aspect_ratio);
        (height * aspect_ratio, height)
    };

    Ok(CanvasDimensions::new(
        bounds.clamp(width).round() as u32,
        bounds.clamp(height).round() as u32,
    ))
}

/// Canvas size for a product area inside a container.
pub fn canvas_for_product(
    product: &ProductArea,
    container: SizeF,
    bounds: CanvasBounds,
) -> Result<CanvasDimensions> {
    compute_canvas_size(container, product.aspect_ratio(), bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;

    fn bounds() -> CanvasBounds {
        CanvasBounds::default()
    }

    #[test]
    fn wide_product_is_limited_by_width() {
        let canvas = compute_canvas_size(SizeF::new(600.0, 600.0), 1.5, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(600, 400));
    }

    #[test]
    fn wide_product_in_short_container_is_limited_by_height() {
        let canvas = compute_canvas_size(SizeF::new(700.0, 300.0), 2.0, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(600, 300));
    }

    #[test]
    fn tall_product_is_limited_by_height() {
        let canvas = compute_canvas_size(SizeF::new(600.0, 600.0), 0.5, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(300, 600));
    }

    #[test]
    fn each_side_is_clamped_independently() {
        // 10:1 product: ideal 600x60, height lifted to the minimum.
        let canvas = compute_canvas_size(SizeF::new(600.0, 600.0), 10.0, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(600, 280));

        // Huge container: both sides capped.
        let canvas = compute_canvas_size(SizeF::new(5000.0, 5000.0), 1.0, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(700, 700));
    }

    #[test]
    fn empty_container_falls_back_to_minimum() {
        let canvas = compute_canvas_size(SizeF::new(0.0, -10.0), 1.0, bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(280, 280));
    }

    #[test]
    fn degenerate_aspect_ratio_is_rejected() {
        assert!(compute_canvas_size(SizeF::new(500.0, 500.0), 0.0, bounds()).is_err());
        assert!(compute_canvas_size(SizeF::new(500.0, 500.0), f64::NAN, bounds()).is_err());
    }

    #[test]
    fn product_wrapper_uses_aspect_ratio() {
        let product = ProductArea::new(4.0, 2.0, Shape::Square).unwrap();
        let canvas = canvas_for_product(&product, SizeF::new(600.0, 600.0), bounds()).unwrap();
        assert_eq!(canvas, CanvasDimensions::new(600, 300));
    }
}
