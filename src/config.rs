//! Engine tuning knobs, loadable from JSON.
//!
//! Every field has a default, so `{}` is a complete configuration:
//!
//! ```
//! use print_placement::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "fitMargin": 0.08, "gridSpacing": 50 }"#).unwrap();
//! assert_eq!(config.fit_margin, 0.08);
//! assert_eq!(config.grid_spacing, 50);
//! assert_eq!(config.canvas_bounds.max_pixels, 700);
//! ```

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fraction of the canvas kept free around a freshly fitted image.
pub const DEFAULT_FIT_MARGIN: f64 = 0.10;

/// Fraction of the image's bounding box that must stay on the canvas.
pub const DEFAULT_MIN_VISIBLE_FRACTION: f64 = 0.25;

/// Inset of the safe zone relative to the print boundary.
pub const DEFAULT_SAFE_MARGIN: f64 = 0.06;

/// Grid line interval in canvas pixels.
pub const DEFAULT_GRID_SPACING: u32 = 40;

/// Upper bound for any margin or visibility fraction.
const MAX_FRACTION: f64 = 0.49;

// ============================================================================
// Bounds
// ============================================================================

/// Pixel range each canvas side is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct CanvasBounds {
    pub min_pixels: u32,
    pub max_pixels: u32,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            min_pixels: 280,
            max_pixels: 700,
        }
    }
}

impl CanvasBounds {
    pub fn new(min_pixels: u32, max_pixels: u32) -> Self {
        Self {
            min_pixels,
            max_pixels,
        }
        .sanitized()
    }

    /// Clamps a single side into the range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_pixels as f64, self.max_pixels as f64)
    }

    fn sanitized(self) -> Self {
        let min = self.min_pixels.max(1);
        Self {
            min_pixels: min.min(self.max_pixels.max(1)),
            max_pixels: self.max_pixels.max(min),
        }
    }
}

/// Allowed range for the user's zoom multiplier (1.0 means "fit").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self { min: 0.05, max: 8.0 }
    }
}

impl ScaleLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }.sanitized()
    }

    /// Clamps a user scale into range. NaN maps to 1.0 (plain fit).
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 1.0_f64.clamp(self.min, self.max);
        }
        value.clamp(self.min, self.max)
    }

    fn sanitized(self) -> Self {
        let defaults = Self::default();
        let min = if self.min.is_finite() && self.min > 0.0 {
            self.min
        } else {
            defaults.min
        };
        let max = if self.max.is_finite() && self.max > 0.0 {
            self.max
        } else {
            defaults.max
        };
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct EngineConfig {
    /// Canvas side clamp.
    pub canvas_bounds: CanvasBounds,

    /// Space reserved on every edge between the container and the canvas.
    pub container_padding: f64,

    /// Margin left free by fit-to-canvas (0.0-0.49).
    pub fit_margin: f64,

    /// Minimum fraction of the image that stays on the canvas (0.0-0.49).
    pub min_visible_fraction: f64,

    /// User zoom range.
    pub scale_limits: ScaleLimits,

    /// Safe zone inset relative to the print boundary (0.0-0.49).
    pub safe_margin: f64,

    /// Grid line interval in canvas pixels.
    pub grid_spacing: u32,

    /// Caption drawn near the bottom of the safe zone.
    pub safe_zone_label: String,

    /// Hex color for guide strokes, e.g. `"#2563eb"`.
    pub guide_color: String,

    /// Resolution used for print-quality export.
    pub print_dpi: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_bounds: CanvasBounds::default(),
            container_padding: 100.0,
            fit_margin: DEFAULT_FIT_MARGIN,
            min_visible_fraction: DEFAULT_MIN_VISIBLE_FRACTION,
            scale_limits: ScaleLimits::default(),
            safe_margin: DEFAULT_SAFE_MARGIN,
            grid_spacing: DEFAULT_GRID_SPACING,
            safe_zone_label: "Safe Zone".to_string(),
            guide_color: "#2563eb".to_string(),
            print_dpi: 300,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canvas_bounds(mut self, bounds: CanvasBounds) -> Self {
        self.canvas_bounds = bounds;
        self.sanitized()
    }

    pub fn with_container_padding(mut self, padding: f64) -> Self {
        self.container_padding = padding;
        self.sanitized()
    }

    pub fn with_fit_margin(mut self, margin: f64) -> Self {
        self.fit_margin = margin;
        self.sanitized()
    }

    pub fn with_min_visible_fraction(mut self, fraction: f64) -> Self {
        self.min_visible_fraction = fraction;
        self.sanitized()
    }

    pub fn with_scale_limits(mut self, limits: ScaleLimits) -> Self {
        self.scale_limits = limits;
        self.sanitized()
    }

    pub fn with_safe_margin(mut self, margin: f64) -> Self {
        self.safe_margin = margin;
        self.sanitized()
    }

    pub fn with_grid_spacing(mut self, spacing: u32) -> Self {
        self.grid_spacing = spacing;
        self.sanitized()
    }

    pub fn with_safe_zone_label(mut self, label: impl Into<String>) -> Self {
        self.safe_zone_label = label.into();
        self
    }

    pub fn with_print_dpi(mut self, dpi: u32) -> Self {
        self.print_dpi = dpi;
        self.sanitized()
    }

    /// Parsed guide stroke color, falling back to the default blue when the
    /// configured value is not a hex color.
    pub fn guide_rgb(&self) -> Srgb<u8> {
        self.guide_color.trim().parse::<Srgb<u8>>().unwrap_or_else(|_| {
            log::warn!("guide color {:?} is not a hex color, using default", self.guide_color);
            Srgb::new(0x25, 0x63, 0xeb)
        })
    }

    /// Forces every field into its legal range.
    pub fn sanitized(mut self) -> Self {
        let fraction = |v: f64, fallback: f64| {
            if v.is_finite() {
                v.clamp(0.0, MAX_FRACTION)
            } else {
                fallback
            }
        };
        self.canvas_bounds = self.canvas_bounds.sanitized();
        self.container_padding = if self.container_padding.is_finite() {
            self.container_padding.max(0.0)
        } else {
            0.0
        };
        self.fit_margin = fraction(self.fit_margin, DEFAULT_FIT_MARGIN);
        self.min_visible_fraction = fraction(self.min_visible_fraction, DEFAULT_MIN_VISIBLE_FRACTION);
        self.scale_limits = self.scale_limits.sanitized();
        self.safe_margin = fraction(self.safe_margin, DEFAULT_SAFE_MARGIN);
        self.grid_spacing = self.grid_spacing.max(2);
        self.print_dpi = self.print_dpi.max(1);
        self
    }

    /// Serializes the config to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the config to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes and sanitizes a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn json_uses_camel_case() {
        let json = EngineConfig::default().to_json_pretty().unwrap();
        assert!(json.contains("\"canvasBounds\""));
        assert!(json.contains("\"minVisibleFraction\""));
        assert!(json.contains("\"safeZoneLabel\""));
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let config = EngineConfig::from_json(
            r#"{ "fitMargin": 2.0, "minVisibleFraction": -1.0, "gridSpacing": 0,
                 "canvasBounds": { "minPixels": 900, "maxPixels": 300 } }"#,
        )
        .unwrap();
        assert_eq!(config.fit_margin, MAX_FRACTION);
        assert_eq!(config.min_visible_fraction, 0.0);
        assert_eq!(config.grid_spacing, 2);
        assert!(config.canvas_bounds.min_pixels <= config.canvas_bounds.max_pixels);
    }

    #[test]
    fn scale_limits_clamp() {
        let limits = ScaleLimits::default();
        assert_eq!(limits.clamp(100.0), 8.0);
        assert_eq!(limits.clamp(0.0), 0.05);
        assert_eq!(limits.clamp(f64::NAN), 1.0);
        assert_eq!(limits.clamp(2.5), 2.5);

        let swapped = ScaleLimits::new(4.0, 0.5);
        assert!(swapped.min <= swapped.max);
    }

    #[test]
    fn guide_color_parses_hex() {
        let config = EngineConfig {
            guide_color: "#ff0080".into(),
            ..EngineConfig::default()
        };
        assert_eq!(config.guide_rgb(), Srgb::new(0xff, 0x00, 0x80));

        let bad = EngineConfig {
            guide_color: "blue-ish".into(),
            ..EngineConfig::default()
        };
        assert_eq!(bad.guide_rgb(), Srgb::new(0x25, 0x63, 0xeb));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::EngineError::Config(_)));
    }
}
