//! Per-frame scene description and its reconciler.
//!
//! A [`Scene`] is an immutable list of nodes computed from the current engine
//! state: guide overlays first, the image last (on top). Hosts that keep a
//! retained scene graph feed each new scene through a [`Reconciler`], which
//! returns the minimal set of removals and additions instead of tearing the
//! whole graph down on every redraw.

use std::collections::HashMap;
use std::fmt::Write as _;

use palette::Srgb;

use crate::asset::SourceHandle;
use crate::geometry::{PixelSize, Point};
use crate::transform::Transform;

// ============================================================================
// Primitives
// ============================================================================

/// Closed outline used for the print boundary, safe zone and export clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outline {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
}

impl Outline {
    /// Shrinks the outline by `fraction` of its size on every side.
    pub fn inset(&self, fraction: f64) -> Self {
        match *self {
            Self::Rect {
                x,
                y,
                width,
                height,
            } => {
                let dx = width * fraction;
                let dy = height * fraction;
                Self::Rect {
                    x: x + dx,
                    y: y + dy,
                    width: (width - 2.0 * dx).max(0.0),
                    height: (height - 2.0 * dy).max(0.0),
                }
            }
            Self::Circle { cx, cy, r } => Self::Circle {
                cx,
                cy,
                r: (r * (1.0 - 2.0 * fraction)).max(0.0),
            },
        }
    }

    /// Lowest y coordinate covered by the outline.
    pub fn bottom(&self) -> f64 {
        match *self {
            Self::Rect { y, height, .. } => y + height,
            Self::Circle { cy, r, .. } => cy + r,
        }
    }

    /// Horizontal center of the outline.
    pub fn center_x(&self) -> f64 {
        match *self {
            Self::Rect { x, width, .. } => x + width / 2.0,
            Self::Circle { cx, .. } => cx,
        }
    }

    /// Uniformly scaled copy, used when rasterizing above 1x.
    pub fn scaled(&self, factor: f64) -> Self {
        match *self {
            Self::Rect {
                x,
                y,
                width,
                height,
            } => Self::Rect {
                x: x * factor,
                y: y * factor,
                width: width * factor,
                height: height * factor,
            },
            Self::Circle { cx, cy, r } => Self::Circle {
                cx: cx * factor,
                cy: cy * factor,
                r: r * factor,
            },
        }
    }
}

/// Stroke style for guide geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Srgb<u8>,
    pub width: f64,
    pub opacity: f64,
    /// Dash and gap lengths; `None` for a solid line.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub fn solid(color: Srgb<u8>, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
            dash: None,
        }
    }

    pub fn dashed(color: Srgb<u8>, width: f64, dash: f64, gap: f64) -> Self {
        Self {
            dash: Some((dash, gap)),
            ..Self::solid(color, width)
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    fn svg_attrs(&self) -> String {
        let mut attrs = format!(
            r#"fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}""#,
            hex(self.color),
            self.width,
            self.opacity
        );
        if let Some((dash, gap)) = self.dash {
            let _ = write!(attrs, r#" stroke-dasharray="{dash} {gap}""#);
        }
        attrs
    }
}

/// Orientation of a grid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// A vertical line at a fixed x.
    Vertical,
    /// A horizontal line at a fixed y.
    Horizontal,
}

// ============================================================================
// Nodes
// ============================================================================

/// Stable identity of a node across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Boundary,
    SafeZone,
    Label,
    GridLine(Axis, u32),
    Image,
}

/// One drawable element of the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    /// Outer print boundary.
    Boundary { outline: Outline, stroke: Stroke },

    /// Inset area guaranteed not to be trimmed.
    SafeZone { outline: Outline, stroke: Stroke },

    /// Caption near the bottom of the safe zone.
    Label {
        text: String,
        anchor: Point,
        font_size: f64,
        color: Srgb<u8>,
    },

    /// One alignment grid line spanning the canvas.
    GridLine {
        axis: Axis,
        index: u32,
        offset: f64,
        length: f64,
        stroke: Stroke,
    },

    /// The placed image, always the topmost node.
    Image {
        source: SourceHandle,
        natural: PixelSize,
        transform: Transform,
    },
}

impl SceneNode {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Boundary { .. } => NodeId::Boundary,
            Self::SafeZone { .. } => NodeId::SafeZone,
            Self::Label { .. } => NodeId::Label,
            Self::GridLine { axis, index, .. } => NodeId::GridLine(*axis, *index),
            Self::Image { .. } => NodeId::Image,
        }
    }

    pub fn is_guide(&self) -> bool {
        !matches!(self, Self::Image { .. })
    }

    /// SVG markup for a guide node at `factor` times canvas size.
    ///
    /// The image node has no SVG form and returns `None`.
    pub fn to_svg(&self, factor: f64) -> Option<String> {
        let scaled = |stroke: &Stroke| Stroke {
            width: stroke.width * factor,
            dash: stroke.dash.map(|(d, g)| (d * factor, g * factor)),
            ..*stroke
        };
        match self {
            Self::Boundary { outline, stroke } | Self::SafeZone { outline, stroke } => {
                Some(outline_svg(&outline.scaled(factor), &scaled(stroke)))
            }
            Self::Label {
                text,
                anchor,
                font_size,
                color,
            } => Some(format!(
                r#"<text x="{}" y="{}" font-size="{}" font-family="sans-serif" text-anchor="middle" fill="{}">{}</text>"#,
                anchor.x * factor,
                anchor.y * factor,
                font_size * factor,
                hex(*color),
                escape_text(text)
            )),
            Self::GridLine {
                axis,
                offset,
                length,
                stroke,
                ..
            } => {
                let (o, l) = (offset * factor, length * factor);
                let (x1, y1, x2, y2) = match axis {
                    Axis::Vertical => (o, 0.0, o, l),
                    Axis::Horizontal => (0.0, o, l, o),
                };
                Some(format!(
                    r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" {}/>"#,
                    scaled(stroke).svg_attrs()
                ))
            }
            Self::Image { .. } => None,
        }
    }
}

fn outline_svg(outline: &Outline, stroke: &Stroke) -> String {
    match *outline {
        Outline::Rect {
            x,
            y,
            width,
            height,
        } => format!(
            r#"<rect x="{x}" y="{y}" width="{width}" height="{height}" {}/>"#,
            stroke.svg_attrs()
        ),
        Outline::Circle { cx, cy, r } => {
            format!(r#"<circle cx="{cx}" cy="{cy}" r="{r}" {}/>"#, stroke.svg_attrs())
        }
    }
}

fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// Scene
// ============================================================================

/// Ordered node list for one frame. Guides come first, the image last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    /// Builds a scene, moving any image node to the top.
    pub fn new(guides: Vec<SceneNode>, image: Option<SceneNode>) -> Self {
        let mut nodes: Vec<SceneNode> = guides.into_iter().filter(SceneNode::is_guide).collect();
        nodes.extend(image);
        Self { nodes }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn guides(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(|n| n.is_guide())
    }

    pub fn image(&self) -> Option<&SceneNode> {
        self.nodes.last().filter(|n| !n.is_guide())
    }

    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// A standalone SVG document of the guide nodes at `factor` times the
    /// canvas size.
    pub fn guides_svg(&self, width: u32, height: u32, factor: f64) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for markup in self.guides().filter_map(|n| n.to_svg(factor)) {
            svg.push_str(&markup);
        }
        svg.push_str("</svg>");
        svg
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Minimal changes that bring a retained scene graph up to date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDiff {
    /// Nodes to delete, including changed nodes that are re-added.
    pub removed: Vec<NodeId>,
    /// Nodes to append, in scene order.
    pub added: Vec<SceneNode>,
    /// The image must be re-raised above newly added guides.
    pub raise_image: bool,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && !self.raise_image
    }
}

/// Tracks what was last drawn and diffs new scenes against it.
#[derive(Debug, Default)]
pub struct Reconciler {
    drawn: HashMap<NodeId, SceneNode>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently drawn.
    pub fn drawn_len(&self) -> usize {
        self.drawn.len()
    }

    /// Diffs `scene` against the drawn state and records it as drawn.
    pub fn reconcile(&mut self, scene: &Scene) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let wanted: HashMap<NodeId, &SceneNode> = scene.nodes().iter().map(|n| (n.id(), n)).collect();

        let mut removed: Vec<NodeId> = self
            .drawn
            .iter()
            .filter(|(id, node)| wanted.get(*id).is_none_or(|want| *want != *node))
            .map(|(id, _)| *id)
            .collect();
        // HashMap order is arbitrary; keep diffs deterministic.
        removed.sort_by_key(node_order);
        for id in &removed {
            self.drawn.remove(id);
        }
        diff.removed = removed;

        for node in scene.nodes() {
            if !self.drawn.contains_key(&node.id()) {
                diff.added.push(node.clone());
                self.drawn.insert(node.id(), node.clone());
            }
        }

        let guides_added = diff.added.iter().any(SceneNode::is_guide);
        let image_added = diff.added.iter().any(|n| !n.is_guide());
        diff.raise_image = guides_added && !image_added && self.drawn.contains_key(&NodeId::Image);

        if !diff.is_empty() {
            log::debug!(
                "scene reconcile: -{} +{} raise_image={}",
                diff.removed.len(),
                diff.added.len(),
                diff.raise_image
            );
        }
        diff
    }

    /// Forgets the drawn state so the next reconcile re-adds everything.
    pub fn clear(&mut self) {
        self.drawn.clear();
    }
}

fn node_order(id: &NodeId) -> (u8, u8, u32) {
    match *id {
        NodeId::Boundary => (0, 0, 0),
        NodeId::SafeZone => (1, 0, 0),
        NodeId::Label => (2, 0, 0),
        NodeId::GridLine(Axis::Vertical, i) => (3, 0, i),
        NodeId::GridLine(Axis::Horizontal, i) => (3, 1, i),
        NodeId::Image => (4, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blue() -> Srgb<u8> {
        Srgb::new(0, 0, 255)
    }

    fn boundary(width: f64) -> SceneNode {
        SceneNode::Boundary {
            outline: Outline::Rect {
                x: 0.0,
                y: 0.0,
                width,
                height: 100.0,
            },
            stroke: Stroke::solid(blue(), 2.0),
        }
    }

    fn grid(index: u32) -> SceneNode {
        SceneNode::GridLine {
            axis: Axis::Vertical,
            index,
            offset: 40.0 * index as f64,
            length: 100.0,
            stroke: Stroke::solid(blue(), 1.0),
        }
    }

    fn image(x: f64) -> SceneNode {
        SceneNode::Image {
            source: SourceHandle::url("a.png"),
            natural: PixelSize::new(10, 10),
            transform: Transform::new(1.0, Point::new(x, 50.0), 0.0),
        }
    }

    #[test]
    fn scene_keeps_image_on_top() {
        let scene = Scene::new(vec![boundary(100.0), image(1.0), grid(1)], Some(image(5.0)));
        assert_eq!(scene.nodes().len(), 3);
        assert_eq!(scene.image(), Some(&image(5.0)));
        assert_eq!(scene.nodes().last().map(SceneNode::id), Some(NodeId::Image));
    }

    #[test]
    fn first_reconcile_adds_everything() {
        let mut reconciler = Reconciler::new();
        let scene = Scene::new(vec![boundary(100.0), grid(1)], Some(image(5.0)));
        let diff = reconciler.reconcile(&scene);
        assert!(diff.removed.is_empty());
        assert_eq!(diff.added.len(), 3);
        assert!(!diff.raise_image);
        assert_eq!(reconciler.drawn_len(), 3);
    }

    #[test]
    fn unchanged_scene_is_a_no_op() {
        let mut reconciler = Reconciler::new();
        let scene = Scene::new(vec![boundary(100.0)], Some(image(5.0)));
        reconciler.reconcile(&scene);
        assert!(reconciler.reconcile(&scene).is_empty());
    }

    #[test]
    fn moved_image_is_replaced_alone() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&Scene::new(vec![boundary(100.0), grid(1)], Some(image(5.0))));
        let diff = reconciler.reconcile(&Scene::new(vec![boundary(100.0), grid(1)], Some(image(9.0))));
        assert_eq!(diff.removed, vec![NodeId::Image]);
        assert_eq!(diff.added, vec![image(9.0)]);
        assert!(!diff.raise_image);
    }

    #[test]
    fn new_guides_raise_the_image() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&Scene::new(vec![boundary(100.0)], Some(image(5.0))));
        let diff = reconciler.reconcile(&Scene::new(vec![boundary(100.0), grid(1), grid(2)], Some(image(5.0))));
        assert!(diff.removed.is_empty());
        assert_eq!(diff.added.len(), 2);
        assert!(diff.raise_image);
    }

    #[test]
    fn dropped_guides_are_removed() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&Scene::new(vec![boundary(100.0), grid(2), grid(1)], None));
        let diff = reconciler.reconcile(&Scene::new(vec![boundary(120.0)], None));
        assert_eq!(
            diff.removed,
            vec![
                NodeId::Boundary,
                NodeId::GridLine(Axis::Vertical, 1),
                NodeId::GridLine(Axis::Vertical, 2)
            ]
        );
        assert_eq!(diff.added, vec![boundary(120.0)]);
    }

    #[test]
    fn guide_svg_markup() {
        let node = SceneNode::SafeZone {
            outline: Outline::Circle {
                cx: 50.0,
                cy: 50.0,
                r: 40.0,
            },
            stroke: Stroke::dashed(blue(), 1.0, 6.0, 4.0),
        };
        let svg = node.to_svg(2.0).unwrap();
        assert!(svg.starts_with("<circle"));
        assert!(svg.contains(r#"r="80""#));
        assert!(svg.contains(r#"stroke-dasharray="12 8""#));
        assert!(image(1.0).to_svg(1.0).is_none());
    }

    #[test]
    fn label_text_is_escaped() {
        let node = SceneNode::Label {
            text: "A < B & C".into(),
            anchor: Point::new(10.0, 10.0),
            font_size: 12.0,
            color: blue(),
        };
        let svg = node.to_svg(1.0).unwrap();
        assert!(svg.contains("A &lt; B &amp; C"));
    }

    #[test]
    fn outline_inset() {
        let rect = Outline::Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(
            rect.inset(0.1),
            Outline::Rect {
                x: 10.0,
                y: 5.0,
                width: 80.0,
                height: 40.0
            }
        );
        let circle = Outline::Circle {
            cx: 50.0,
            cy: 50.0,
            r: 50.0,
        };
        assert_eq!(circle.inset(0.1).bottom(), 90.0);
    }
}
