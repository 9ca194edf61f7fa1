//! Safe zone layer: dashed inset of the print boundary plus its caption.

use palette::Srgb;

use super::{
    DependencyVersion, GuideOutline, LayerConfig, LayerEffect, LayerVersions, RenderContext,
    shift_lightness,
};
use crate::geometry::Point;
use crate::scene::{SceneNode, Stroke};

/// Configuration for the safe zone.
///
/// # Consumed Properties
///
/// - [`GuideOutline`]: the boundary to inset. Without it the layer falls
///   back to the full canvas rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct SafeZoneConfig {
    /// Inset as a fraction of the boundary size.
    pub margin: f64,
    /// Caption such as "Safe Zone" or "Design Area"; empty hides it.
    pub label: String,
    pub color: Srgb<u8>,
}

impl SafeZoneConfig {
    /// The margin is clamped to 0.0-0.49.
    pub fn new(margin: f64, label: impl Into<String>, color: Srgb<u8>) -> Self {
        Self {
            margin: margin.clamp(0.0, 0.49),
            label: label.into(),
            color,
        }
    }
}

impl LayerConfig for SafeZoneConfig {
    fn differs_from(&self, other: &Self) -> bool {
        (self.margin - other.margin).abs() > 0.0001
            || self.label != other.label
            || self.color != other.color
    }
}

impl LayerEffect for SafeZoneConfig {
    /// The safe zone insets whatever outline the boundary emitted.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::from_version(versions.boundary)
    }

    fn describe(&self, ctx: &mut RenderContext) {
        let GuideOutline(boundary) = ctx
            .get::<GuideOutline>()
            .copied()
            .unwrap_or_else(|| GuideOutline::for_shape(Default::default(), ctx.canvas));

        let outline = boundary.inset(self.margin);
        let color = shift_lightness(self.color, 0.1);
        ctx.nodes.push(SceneNode::SafeZone {
            outline,
            stroke: Stroke::dashed(color, 1.5, 8.0, 6.0),
        });

        if self.label.is_empty() {
            return;
        }
        let short_side = ctx.canvas.width.min(ctx.canvas.height) as f64;
        let font_size = (short_side * 0.035).max(10.0);
        ctx.nodes.push(SceneNode::Label {
            text: self.label.clone(),
            anchor: Point::new(outline.center_x(), outline.bottom() - font_size * 0.6),
            font_size,
            color,
        });
    }
}
