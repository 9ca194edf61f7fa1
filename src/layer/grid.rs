//! Alignment grid layer. Cosmetic only; never feeds constraint math.

use palette::Srgb;

use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext, shift_lightness};
use crate::scene::{Axis, SceneNode, Stroke};

/// Configuration for the alignment grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Distance between lines in canvas pixels.
    pub spacing: u32,
    pub color: Srgb<u8>,
}

impl GridConfig {
    /// Spacing is raised to at least 2 pixels.
    pub fn new(spacing: u32, color: Srgb<u8>) -> Self {
        Self {
            spacing: spacing.max(2),
            color,
        }
    }
}

impl LayerConfig for GridConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

impl LayerEffect for GridConfig {
    fn dependencies(_versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::NONE
    }

    fn describe(&self, ctx: &mut RenderContext) {
        let stroke = Stroke::solid(shift_lightness(self.color, 0.25), 1.0).with_opacity(0.35);
        let (width, height) = (ctx.canvas.width, ctx.canvas.height);

        for (axis, extent, length) in [
            (Axis::Vertical, width, height),
            (Axis::Horizontal, height, width),
        ] {
            let lines = (1..)
                .map(|index: u32| (index, index * self.spacing))
                .take_while(|(_, offset)| *offset < extent);
            for (index, offset) in lines {
                ctx.nodes.push(SceneNode::GridLine {
                    axis,
                    index,
                    offset: offset as f64,
                    length: length as f64,
                    stroke,
                });
            }
        }
    }
}
