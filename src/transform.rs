//! The authoritative placement of an image on the canvas.

use crate::geometry::{PixelSize, Point, SizeF};

/// Scale, center position and rotation of the image in canvas space.
///
/// Scaling is uniform: a single factor backs both [`scale_x`](Self::scale_x)
/// and [`scale_y`](Self::scale_y), so they cannot drift apart. The center is
/// the image's own center in canvas pixels. Any angle is accepted and kept
/// normalized to `[0, 360)`; stepping in 90° increments is the caller's
/// business.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f64,
    center: Point,
    angle_degrees: f64,
}

impl Transform {
    pub fn new(scale: f64, center: Point, angle_degrees: f64) -> Self {
        Self {
            scale,
            center,
            angle_degrees: normalize_degrees(angle_degrees),
        }
    }

    pub fn scale_x(&self) -> f64 {
        self.scale
    }

    pub fn scale_y(&self) -> f64 {
        self.scale
    }

    /// The uniform scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn center_x(&self) -> f64 {
        self.center.x
    }

    pub fn center_y(&self) -> f64 {
        self.center.y
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    pub fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }

    pub fn set_angle(&mut self, degrees: f64) {
        self.angle_degrees = normalize_degrees(degrees);
    }

    pub fn rotate_by(&mut self, degrees: f64) {
        self.set_angle(self.angle_degrees + degrees);
    }

    /// Unrotated size of the scaled image.
    pub fn footprint(&self, natural: PixelSize) -> SizeF {
        SizeF::new(
            natural.width as f64 * self.scale,
            natural.height as f64 * self.scale,
        )
    }

    /// Axis-aligned box around the rotated footprint.
    ///
    /// Equals [`footprint`](Self::footprint) at 0° and 180°, and swaps its
    /// sides at 90° and 270°.
    pub fn bounding_box(&self, natural: PixelSize) -> SizeF {
        let footprint = self.footprint(natural);
        let (sin, cos) = self.angle_degrees.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        SizeF::new(
            footprint.width * cos + footprint.height * sin,
            footprint.width * sin + footprint.height * cos,
        )
    }

    /// Top-left corner of the unrotated footprint.
    pub fn top_left(&self, natural: PixelSize) -> Point {
        let footprint = self.footprint(natural);
        Point::new(
            self.center.x - footprint.width / 2.0,
            self.center.y - footprint.height / 2.0,
        )
    }
}

/// Maps any angle into `[0, 360)`. Non-finite input maps to 0.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs.
    if normalized >= 360.0 { 0.0 } else { normalized }
}
