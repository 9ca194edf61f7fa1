//! Rasterization of the image layer.
//!
//! The image is drawn with a single affine transform
//! `scale(multiplier) · translate(center) · rotate(angle) · scale(s) · translate(-natural/2)`,
//! so output at any multiplier is the same placement at a higher pixel
//! density.

use image::RgbaImage;
use resvg::tiny_skia::{
    FillRule, FilterQuality, Mask, PathBuilder, Pixmap, PixmapPaint, Rect, Transform as SkTransform,
};

use crate::asset::ImageAsset;
use crate::error::{EngineError, Result};
use crate::geometry::{CanvasDimensions, PixelSize};
use crate::layer::svg::pixmap_to_rgba_image;
use crate::scene::Outline;
use crate::transform::Transform;

/// Largest output side, in pixels.
pub const MAX_OUTPUT_SIDE: u32 = 16_384;

/// Validates an output multiplier and returns the raster size it produces.
///
/// Sizes above [`MAX_OUTPUT_SIDE`] on either axis are rejected before any
/// buffer is allocated.
pub fn output_size(canvas: CanvasDimensions, multiplier: f64) -> Result<PixelSize> {
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(EngineError::degenerate(format!("export multiplier {multiplier}")));
    }
    let limit = MAX_OUTPUT_SIDE as f64;
    let width = (canvas.width as f64 * multiplier).round();
    let height = (canvas.height as f64 * multiplier).round();
    if width > limit || height > limit {
        return Err(EngineError::degenerate(format!(
            "output {width}x{height} at x{multiplier} exceeds {MAX_OUTPUT_SIDE}px"
        )));
    }
    Ok(canvas.scaled(multiplier))
}

/// Maps image pixel space to output pixel space.
pub fn image_to_output(transform: &Transform, natural: PixelSize, multiplier: f64) -> SkTransform {
    let m = multiplier as f32;
    let s = transform.scale() as f32;
    let center = transform.center();
    SkTransform::from_scale(m, m)
        .pre_translate(center.x as f32, center.y as f32)
        .pre_concat(SkTransform::from_rotate(transform.angle_degrees() as f32))
        .pre_scale(s, s)
        .pre_translate(-(natural.width as f32) / 2.0, -(natural.height as f32) / 2.0)
}

/// Builds an anti-aliased clip mask for an outline in output pixels.
fn clip_mask(outline: &Outline, size: PixelSize, multiplier: f64) -> Option<Mask> {
    let path = match outline.scaled(multiplier) {
        Outline::Rect {
            x,
            y,
            width,
            height,
        } => PathBuilder::from_rect(Rect::from_xywh(x as f32, y as f32, width as f32, height as f32)?),
        Outline::Circle { cx, cy, r } => PathBuilder::from_circle(cx as f32, cy as f32, r as f32)?,
    };
    let mut mask = Mask::new(size.width, size.height)?;
    mask.fill_path(&path, FillRule::Winding, true, SkTransform::identity());
    Some(mask)
}

/// Draws the placed image onto a transparent raster.
///
/// With `clip` set, pixels outside the outline are left transparent. A
/// degenerate clip (zero-radius circle) clips everything away.
pub fn render_image_layer(
    asset: &ImageAsset,
    transform: &Transform,
    canvas: CanvasDimensions,
    multiplier: f64,
    clip: Option<&Outline>,
) -> Result<RgbaImage> {
    let size = output_size(canvas, multiplier)?;
    let mut target = Pixmap::new(size.width, size.height)
        .ok_or_else(|| EngineError::degenerate(format!("raster {}x{}", size.width, size.height)))?;

    let mask = match clip {
        Some(outline) => match clip_mask(outline, size, multiplier) {
            Some(mask) => Some(mask),
            None => return Ok(pixmap_to_rgba_image(&target)),
        },
        None => None,
    };

    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(
        0,
        0,
        asset.pixmap().as_ref(),
        &paint,
        image_to_output(transform, asset.natural_size(), multiplier),
        mask.as_ref(),
    );

    Ok(pixmap_to_rgba_image(&target))
}

/// A fully transparent raster of the output size.
pub fn blank(canvas: CanvasDimensions, multiplier: f64) -> Result<RgbaImage> {
    let size = output_size(canvas, multiplier)?;
    Ok(RgbaImage::new(size.width, size.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::SourceHandle;
    use crate::geometry::Point;
    use image::Rgba;

    fn assert_red(pixel: &Rgba<u8>) {
        let [r, g, b, a] = pixel.0;
        assert!(r > 250 && g < 5 && b < 5 && a > 250, "expected opaque red, got {pixel:?}");
    }

    fn red_asset(width: u32, height: u32) -> ImageAsset {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        ImageAsset::from_rgba(SourceHandle::url("red"), &img).unwrap()
    }

    #[test]
    fn rejects_bad_multipliers() {
        let canvas = CanvasDimensions::new(100, 100);
        assert!(output_size(canvas, 0.0).is_err());
        assert!(output_size(canvas, -1.0).is_err());
        assert!(output_size(canvas, f64::NAN).is_err());
        assert_eq!(output_size(canvas, 3.0).unwrap(), PixelSize::new(300, 300));
    }

    #[test]
    fn rejects_oversized_output() {
        let canvas = CanvasDimensions::new(400, 400);
        assert!(matches!(
            output_size(canvas, 1.0e7),
            Err(EngineError::DegenerateGeometry { .. })
        ));
        assert!(blank(canvas, 1.0e7).is_err());
        assert!(output_size(canvas, f64::MAX).is_err());

        let edge = MAX_OUTPUT_SIDE as f64 / 400.0;
        assert_eq!(output_size(canvas, edge).unwrap().width, MAX_OUTPUT_SIDE);
        assert!(output_size(canvas, edge * 1.01).is_err());
    }

    #[test]
    fn centered_image_covers_middle_only() {
        let canvas = CanvasDimensions::new(100, 100);
        let asset = red_asset(50, 50);
        let transform = Transform::new(1.0, Point::new(50.0, 50.0), 0.0);
        let out = render_image_layer(&asset, &transform, canvas, 1.0, None).unwrap();

        assert_red(out.get_pixel(50, 50));
        assert_eq!(out.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn multiplier_scales_placement() {
        let canvas = CanvasDimensions::new(100, 100);
        let asset = red_asset(20, 20);
        // Image spans 10..30 on the canvas.
        let transform = Transform::new(1.0, Point::new(20.0, 20.0), 0.0);
        let out = render_image_layer(&asset, &transform, canvas, 2.0, None).unwrap();

        assert_eq!(out.dimensions(), (200, 200));
        assert_red(out.get_pixel(40, 40));
        assert_eq!(out.get_pixel(70, 70)[3], 0);
    }

    #[test]
    fn rotation_turns_footprint() {
        let canvas = CanvasDimensions::new(100, 100);
        let asset = red_asset(80, 10);
        let transform = Transform::new(1.0, Point::new(50.0, 50.0), 90.0);
        let out = render_image_layer(&asset, &transform, canvas, 1.0, None).unwrap();

        // Tall after a quarter turn.
        assert_red(out.get_pixel(50, 15));
        assert_eq!(out.get_pixel(15, 50)[3], 0);
    }

    #[test]
    fn circle_clip_trims_corners() {
        let canvas = CanvasDimensions::new(100, 100);
        let asset = red_asset(100, 100);
        let transform = Transform::new(1.0, Point::new(50.0, 50.0), 0.0);
        let clip = Outline::Circle {
            cx: 50.0,
            cy: 50.0,
            r: 50.0,
        };
        let out = render_image_layer(&asset, &transform, canvas, 1.0, Some(&clip)).unwrap();

        assert_red(out.get_pixel(50, 50));
        assert_eq!(out.get_pixel(2, 2)[3], 0);
        assert_eq!(out.get_pixel(97, 97)[3], 0);
    }
}
