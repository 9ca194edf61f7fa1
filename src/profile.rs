//! Serializable placement profile.
//!
//! A [`PlacementProfile`] is what a committed placement looks like on the
//! wire: the product, the user's zoom and rotation, and the image center
//! normalized to the canvas, so the placement survives being restored into
//! a container of a different size.
//!
//! # Example
//!
//! ```
//! use print_placement::{NormalizedCenter, PlacementProfile, ProductSettings, Shape};
//!
//! let profile = PlacementProfile::new()
//!     .with_product(ProductSettings { width: 5.0, height: 5.0, shape: Shape::Round })
//!     .with_user_scale(1.5)
//!     .with_center(NormalizedCenter { x: 0.4, y: 0.5 });
//!
//! let json = profile.to_json().unwrap();
//! let restored = PlacementProfile::from_json(&json).unwrap();
//! assert_eq!(restored, profile);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::geometry::{CanvasDimensions, Point, ProductArea, Shape};

// ============================================================================
// Settings
// ============================================================================

/// Serializable form of a [`ProductArea`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ProductSettings {
    /// Physical width in product units.
    pub width: f64,

    /// Physical height in product units.
    pub height: f64,

    #[serde(default)]
    pub shape: Shape,
}

impl From<&ProductArea> for ProductSettings {
    fn from(area: &ProductArea) -> Self {
        Self {
            width: area.width_units(),
            height: area.height_units(),
            shape: area.shape(),
        }
    }
}

impl TryFrom<ProductSettings> for ProductArea {
    type Error = EngineError;

    fn try_from(settings: ProductSettings) -> Result<Self> {
        ProductArea::new(settings.width, settings.height, settings.shape)
    }
}

/// Image center as a fraction of the canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct NormalizedCenter {
    pub x: f64,
    pub y: f64,
}

impl NormalizedCenter {
    /// The canvas center.
    pub const CENTERED: Self = Self { x: 0.5, y: 0.5 };

    pub fn from_point(point: Point, canvas: CanvasDimensions) -> Self {
        let ratio = |v: f64, extent: u32| if extent == 0 { 0.5 } else { v / extent as f64 };
        Self {
            x: ratio(point.x, canvas.width),
            y: ratio(point.y, canvas.height),
        }
    }

    pub fn to_point(self, canvas: CanvasDimensions) -> Point {
        let fix = |v: f64| if v.is_finite() { v } else { 0.5 };
        Point::new(
            fix(self.x) * canvas.width as f64,
            fix(self.y) * canvas.height as f64,
        )
    }
}

impl Default for NormalizedCenter {
    fn default() -> Self {
        Self::CENTERED
    }
}

fn default_user_scale() -> f64 {
    1.0
}

// ============================================================================
// PlacementProfile
// ============================================================================

/// A serializable snapshot of one placement.
///
/// # JSON Format
///
/// ```json
/// {
///   "product": { "width": 5.0, "height": 5.0, "shape": "round" },
///   "userScale": 1.0,
///   "rotationDegrees": 90.0,
///   "center": { "x": 0.5, "y": 0.5 },
///   "showGrid": false
/// }
/// ```
///
/// Every field is optional on input, so `{}` restores a centered,
/// unrotated fit on whatever product the surface already has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct PlacementProfile {
    /// Product the placement was made for. `None` keeps the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSettings>,

    /// Zoom relative to fit-to-canvas.
    #[serde(default = "default_user_scale")]
    pub user_scale: f64,

    #[serde(default)]
    pub rotation_degrees: f64,

    #[serde(default)]
    pub center: NormalizedCenter,

    #[serde(default)]
    pub show_grid: bool,
}

impl Default for PlacementProfile {
    fn default() -> Self {
        Self {
            product: None,
            user_scale: default_user_scale(),
            rotation_degrees: 0.0,
            center: NormalizedCenter::CENTERED,
            show_grid: false,
        }
    }
}

impl PlacementProfile {
    /// A centered, unrotated fit with no product.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: ProductSettings) -> Self {
        self.product = Some(product);
        self
    }

    pub fn with_user_scale(mut self, user_scale: f64) -> Self {
        self.user_scale = user_scale;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn with_center(mut self, center: NormalizedCenter) -> Self {
        self.center = center;
        self
    }

    pub fn with_show_grid(mut self, show_grid: bool) -> Self {
        self.show_grid = show_grid;
        self
    }

    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
