//! Fit-to-canvas and constraint math.
//!
//! All functions here are pure. The effective render scale of an image is
//! always `fit_scale * user_scale`, so a user scale of 1.0 means "fit to
//! canvas" rather than natural pixel size. That indirection lets a canvas
//! resize rescale the image without changing the user's relative zoom.

use crate::config::ScaleLimits;
use crate::error::{EngineError, Result};
use crate::geometry::{CanvasDimensions, PixelSize, Point, SizeF};
use crate::transform::Transform;

/// Outcome of fit-to-canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    /// Scale at which the image fills the canvas minus the margin.
    pub fit_scale: f64,
    /// Centered transform at user scale 1.0.
    pub transform: Transform,
}

/// The legal range for the image center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRange {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl PositionRange {
    /// Nearest legal point, clamped per axis.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            clamp_ordered(point.x, self.min_x, self.max_x),
            clamp_ordered(point.y, self.min_y, self.max_y),
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        self.clamp(point) == point
    }
}

/// Scale at which `natural` fits in the canvas with `margin` left free.
///
/// Fails with `DegenerateGeometry` for a zero-sized image, so callers never
/// place a zero-size asset.
pub fn fit_scale(canvas: CanvasDimensions, natural: PixelSize, margin: f64) -> Result<f64> {
    if natural.is_empty() {
        return Err(EngineError::degenerate(format!(
            "image natural size {}x{}",
            natural.width, natural.height
        )));
    }
    let usable = 1.0 - margin;
    let by_width = canvas.width as f64 * usable / natural.width as f64;
    let by_height = canvas.height as f64 * usable / natural.height as f64;
    Ok(by_width.min(by_height))
}

/// Scales and centers an image on the canvas.
///
/// `angle_degrees` is carried through unchanged: pass 0.0 for a full reset,
/// or the current angle to refit while preserving rotation.
pub fn fit_to_canvas(
    canvas: CanvasDimensions,
    natural: PixelSize,
    margin: f64,
    angle_degrees: f64,
) -> Result<Fit> {
    let fit_scale = fit_scale(canvas, natural, margin)?;
    Ok(Fit {
        fit_scale,
        transform: Transform::new(fit_scale, canvas.center(), angle_degrees),
    })
}

/// Legal center range so that at least `min_visible` of the footprint stays
/// on the canvas along each axis.
pub fn position_range(canvas: CanvasDimensions, footprint: SizeF, min_visible: f64) -> PositionRange {
    let axis = |extent: f64, canvas_extent: f64| {
        let visible = extent * min_visible;
        (visible - extent / 2.0, canvas_extent - visible + extent / 2.0)
    };
    let (min_x, max_x) = axis(footprint.width, canvas.width as f64);
    let (min_y, max_y) = axis(footprint.height, canvas.height as f64);
    PositionRange {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

/// Clamps a center so the minimum visible fraction stays on the canvas.
///
/// Drags are never rejected; an out-of-range center moves to the nearest
/// legal point.
pub fn constrain_position(
    canvas: CanvasDimensions,
    footprint: SizeF,
    center: Point,
    min_visible: f64,
) -> Point {
    position_range(canvas, footprint, min_visible).clamp(center)
}

/// Clamps a transform's center in place using the bounding box of its
/// rotated footprint.
pub fn constrain_transform(
    canvas: CanvasDimensions,
    natural: PixelSize,
    transform: &mut Transform,
    min_visible: f64,
) {
    let clamped = constrain_position(
        canvas,
        transform.bounding_box(natural),
        transform.center(),
        min_visible,
    );
    transform.set_center(clamped);
}

/// Clamps a user zoom multiplier into the configured range.
pub fn clamp_user_scale(value: f64, limits: ScaleLimits) -> f64 {
    limits.clamp(value)
}

/// Re-derives a transform for a new canvas size without refitting.
///
/// The center moves proportionally with the canvas, the rotation is kept,
/// and the effective scale follows the new fit scale while the user's zoom
/// stays what it was.
pub fn rescale_for_canvas(
    transform: &Transform,
    old_canvas: CanvasDimensions,
    new_canvas: CanvasDimensions,
    new_fit_scale: f64,
    user_scale: f64,
) -> Transform {
    let ratio = |new: u32, old: u32| if old == 0 { 1.0 } else { new as f64 / old as f64 };
    let center = transform.center();
    Transform::new(
        new_fit_scale * user_scale,
        Point::new(
            center.x * ratio(new_canvas.width, old_canvas.width),
            center.y * ratio(new_canvas.height, old_canvas.height),
        ),
        transform.angle_degrees(),
    )
}

/// Clamp that tolerates an inverted range by collapsing it to its midpoint.
fn clamp_ordered(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        return (min + max) / 2.0;
    }
    value.clamp(min, max)
}
