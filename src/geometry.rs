//! Geometry types shared by the sizing, fitting and rendering stages.
//!
//! Physical product dimensions are kept in abstract "units" (inches in the
//! product catalogue); everything on the canvas is in pixels.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ============================================================================
// Pixel sizes and points
// ============================================================================

/// A 2D size in whole pixels.
///
/// Used for natural image dimensions and raster output sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_f64(self) -> SizeF {
        SizeF::new(self.width as f64, self.height as f64)
    }
}

/// A 2D size in fractional pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

impl SizeF {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Shrinks both sides by `padding` on every edge, never below zero.
    pub fn inset(self, padding: f64) -> Self {
        Self {
            width: (self.width - 2.0 * padding).max(0.0),
            height: (self.height - 2.0 * padding).max(0.0),
        }
    }

    /// Replaces negative or non-finite sides with zero.
    pub fn sanitized(self) -> Self {
        let fix = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }
}

/// A point in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Canvas
// ============================================================================

/// The pixel size of the working canvas.
///
/// Derived from a [`ProductArea`] and the available container space by
/// [`compute_canvas_size`](crate::compute_canvas_size); never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> SizeF {
        SizeF::new(self.width as f64, self.height as f64)
    }

    pub fn center(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Canvas size multiplied by an export multiplier, rounded to whole
    /// pixels (at least one on each side).
    pub fn scaled(&self, multiplier: f64) -> PixelSize {
        let side = |v: u32| ((v as f64 * multiplier).round() as u32).max(1);
        PixelSize::new(side(self.width), side(self.height))
    }
}

// ============================================================================
// Product area
// ============================================================================

/// Outline of the printed product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum Shape {
    /// Rectangular die cut.
    #[default]
    Square,
    /// Circular die cut inscribed in the canvas.
    Round,
    /// Free-form die cut; guides fall back to the rectangle.
    Custom,
}

impl Shape {
    pub fn is_round(&self) -> bool {
        matches!(self, Self::Round)
    }
}

/// Physical dimensions and outline of the item being printed.
///
/// Both dimensions are strictly positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductArea {
    width_units: f64,
    height_units: f64,
    shape: Shape,
}

impl ProductArea {
    /// Creates a product area, rejecting zero, negative or non-finite sides.
    pub fn new(width_units: f64, height_units: f64, shape: Shape) -> Result<Self> {
        if !(width_units.is_finite() && width_units > 0.0)
            || !(height_units.is_finite() && height_units > 0.0)
        {
            return Err(EngineError::degenerate(format!(
                "product area {width_units}x{height_units}"
            )));
        }
        Ok(Self {
            width_units,
            height_units,
            shape,
        })
    }

    /// Parses a catalogue size label such as `"5x5"` or `"2.5x3.5"`.
    ///
    /// ```
    /// use print_placement::{ProductArea, Shape};
    ///
    /// let area = ProductArea::parse_size("4.75x2", Shape::Square).unwrap();
    /// assert_eq!(area.width_units(), 4.75);
    /// assert_eq!(area.height_units(), 2.0);
    /// ```
    pub fn parse_size(label: &str, shape: Shape) -> Result<Self> {
        let invalid = || EngineError::degenerate(format!("unrecognized size label {label:?}"));
        let (w, h) = label
            .trim()
            .split_once(['x', 'X', '×'])
            .ok_or_else(invalid)?;
        let w: f64 = w.trim().parse().map_err(|_| invalid())?;
        let h: f64 = h.trim().parse().map_err(|_| invalid())?;
        Self::new(w, h, shape)
    }

    pub fn width_units(&self) -> f64 {
        self.width_units
    }

    pub fn height_units(&self) -> f64 {
        self.height_units
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns a copy with a different outline.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width_units / self.height_units
    }
}
