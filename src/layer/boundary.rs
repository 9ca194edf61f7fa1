//! Print boundary layer: the full product outline.

use palette::Srgb;

use super::{DependencyVersion, GuideOutline, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::geometry::Shape;
use crate::scene::{SceneNode, Stroke};

/// Stroke width of the boundary in canvas pixels.
const BOUNDARY_STROKE: f64 = 2.0;

/// Configuration for the print boundary.
///
/// # Emitted Properties
///
/// - [`GuideOutline`]: the outline the safe zone insets.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConfig {
    pub shape: Shape,
    pub color: Srgb<u8>,
}

impl BoundaryConfig {
    pub fn new(shape: Shape, color: Srgb<u8>) -> Self {
        Self { shape, color }
    }
}

impl LayerConfig for BoundaryConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

impl LayerEffect for BoundaryConfig {
    fn dependencies(_versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::NONE
    }

    fn describe(&self, ctx: &mut RenderContext) {
        let GuideOutline(outline) = GuideOutline::for_shape(self.shape, ctx.canvas);
        ctx.nodes.push(SceneNode::Boundary {
            outline,
            stroke: Stroke::solid(self.color, BOUNDARY_STROKE),
        });
    }

    fn emit(&self, ctx: &mut RenderContext) {
        ctx.set(GuideOutline::for_shape(self.shape, ctx.canvas));
    }
}
