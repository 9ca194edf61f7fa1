//! Guide overlay layers.
//!
//! Each guide (print boundary, safe zone, grid) is a [`Layer`] holding a
//! configuration, an enabled flag, a version counter for cache
//! invalidation, and a per-canvas-size cache of the scene nodes it produced.
//!
//! # Architecture
//!
//! Each layer config implements [`LayerEffect`], which defines:
//! - Which scene nodes the layer describes for a canvas
//! - What properties it emits for downstream layers
//! - Which upstream layers its cache depends on
//!
//! Properties flow through the pipeline via [`RenderContext`]. The boundary
//! layer emits the [`GuideOutline`] that the safe zone insets, so the two
//! never disagree about the product shape.

pub mod boundary;
pub mod grid;
pub mod safe_zone;
pub mod svg;

pub use boundary::BoundaryConfig;
pub use grid::GridConfig;
pub use safe_zone::SafeZoneConfig;

use std::any::{Any, TypeId};
use std::collections::HashMap;

use image::RgbaImage;
use palette::{Hsl, IntoColor, Srgb};

use crate::config::EngineConfig;
use crate::geometry::{CanvasDimensions, Shape};
use crate::scene::{Outline, Scene, SceneNode};

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the guide pipeline for one canvas size.
///
/// Layers append scene nodes and can read properties set by upstream layers.
pub struct RenderContext {
    /// Canvas the guides are laid out on.
    pub canvas: CanvasDimensions,

    /// Nodes produced so far, in draw order.
    pub nodes: Vec<SceneNode>,

    /// Typed property bag for inter-layer communication.
    properties: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RenderContext {
    pub fn new(canvas: CanvasDimensions) -> Self {
        Self {
            canvas,
            nodes: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Sets a typed property that downstream layers can read.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.properties.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed property set by an upstream layer.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.properties
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }
}

// ============================================================================
// Common Properties
// ============================================================================

/// The print boundary outline for the current canvas.
///
/// Emitted by the boundary layer, consumed by the safe zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideOutline(pub Outline);

impl GuideOutline {
    /// Outline of `shape` on `canvas`: the full rectangle, or the inscribed
    /// circle for round products.
    pub fn for_shape(shape: Shape, canvas: CanvasDimensions) -> Self {
        let (w, h) = (canvas.width as f64, canvas.height as f64);
        match shape {
            Shape::Round => Self(Outline::Circle {
                cx: w / 2.0,
                cy: h / 2.0,
                r: w.min(h) / 2.0,
            }),
            Shape::Square | Shape::Custom => Self(Outline::Rect {
                x: 0.0,
                y: 0.0,
                width: w,
                height: h,
            }),
        }
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
///
/// Implementations must detect when a configuration meaningfully differs
/// from another, which drives cache invalidation.
pub trait LayerConfig: Clone {
    /// Returns true if this config differs from another in a way that
    /// would produce different output.
    fn differs_from(&self, other: &Self) -> bool;
}

/// Trait for layer configurations that know how to describe themselves.
pub trait LayerEffect: LayerConfig {
    /// Returns the dependency version for cache invalidation.
    ///
    /// Root layers return `DependencyVersion::NONE`.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion;

    /// Appends this layer's nodes to `ctx.nodes`, reading upstream
    /// properties as needed.
    fn describe(&self, ctx: &mut RenderContext);

    /// Emits properties for downstream layers. Called after
    /// [`describe`](Self::describe), and again on cache hits.
    fn emit(&self, _ctx: &mut RenderContext) {}
}

// ============================================================================
// Layer Dependencies
// ============================================================================

/// Combined version of upstream layer dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DependencyVersion(u64);

impl DependencyVersion {
    /// No dependencies (root layer).
    pub const NONE: Self = Self(0);

    pub fn from_version(version: u64) -> Self {
        Self(version)
    }

    /// Combines multiple upstream layer versions into one.
    ///
    /// Order-sensitive, so bumping different layers never cancels out.
    pub fn combine(versions: &[u64]) -> Self {
        Self(
            versions
                .iter()
                .fold(17u64, |acc, v| acc.wrapping_mul(31).wrapping_add(*v)),
        )
    }
}

/// Snapshot of all layer versions in the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct LayerVersions {
    pub boundary: u64,
    pub safe_zone: u64,
    pub grid: u64,
}

// ============================================================================
// CacheKey
// ============================================================================

/// Key for cached layer output: canvas size plus raster multiplier bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    width: u32,
    height: u32,
    scale_bits: u64,
}

impl CacheKey {
    pub fn new(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width,
            height,
            scale_bits: scale.to_bits(),
        }
    }

    /// Key for resolution-independent output (scene nodes).
    pub fn from_canvas(canvas: CanvasDimensions) -> Self {
        Self::new(canvas.width, canvas.height, 1.0)
    }
}

// ============================================================================
// Generic Layer
// ============================================================================

/// A generic layer with configuration, caching, and version tracking.
pub struct Layer<C: LayerConfig> {
    config: Option<C>,
    enabled: bool,
    version: u64,
    cache: HashMap<CacheKey, (Vec<SceneNode>, u64)>,
}

impl<C: LayerConfig> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            enabled: true,
            version: 0,
            cache: HashMap::new(),
        }
    }
}

impl<C: LayerConfig> Layer<C> {
    /// Creates an enabled layer with a config already set.
    pub fn with_config(config: C) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer is active (has config AND is enabled).
    pub fn is_active(&self) -> bool {
        self.enabled && self.config.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets whether the layer is enabled. Returns true if the state changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.invalidate();
            true
        } else {
            false
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the configuration. Returns true if it changed.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
            self.invalidate();
        }
        differs
    }

    /// Invalidates the cache and increments version.
    pub fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.cache.clear();
    }

    /// Gets cached nodes if valid for the given key and dependency version.
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&[SceneNode]> {
        self.cache
            .get(&key)
            .filter(|(_, stored_dep)| *stored_dep == deps.0)
            .map(|(nodes, _)| nodes.as_slice())
    }

    /// Stores nodes in the cache with the current dependency version.
    pub fn store(&mut self, key: CacheKey, nodes: Vec<SceneNode>, deps: DependencyVersion) {
        self.cache.insert(key, (nodes, deps.0));
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Applies this layer to the render context, using the cache if valid.
    ///
    /// Inactive layers pass the context through unchanged.
    pub fn apply(&mut self, ctx: &mut RenderContext, versions: &LayerVersions) {
        let Some(config) = self.config.as_ref().filter(|_| self.enabled) else {
            return;
        };
        let key = CacheKey::from_canvas(ctx.canvas);
        let deps = C::dependencies(versions);

        if let Some(cached) = self.get_cached(key, deps) {
            ctx.nodes.extend_from_slice(cached);
            // Properties are not cached, only nodes.
            config.emit(ctx);
            return;
        }

        let start = ctx.nodes.len();
        config.describe(ctx);
        config.emit(ctx);

        let produced = ctx.nodes[start..].to_vec();
        self.store(key, produced, deps);
    }
}

// ============================================================================
// Composite Layer
// ============================================================================

/// A cache-only layer holding the rasterized guides.
///
/// Keyed by canvas size and multiplier. An entry only hits while the guide
/// versions it was stored with are current.
#[derive(Default)]
pub struct CompositeLayer {
    cache: HashMap<CacheKey, (RgbaImage, u64)>,
}

impl CompositeLayer {
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.cache
            .get(&key)
            .filter(|(_, stored_dep)| *stored_dep == deps.0)
            .map(|(img, _)| img)
    }

    pub fn store(&mut self, key: CacheKey, image: RgbaImage, deps: DependencyVersion) {
        self.cache.insert(key, (image, deps.0));
    }
}

// ============================================================================
// Guide Pipeline
// ============================================================================

/// All guide layers with their dependency relationships.
///
/// ```text
/// ┌──────────┐
/// │ Boundary │ ◄── root, emits GuideOutline
/// └────┬─────┘
///      ▼
/// ┌──────────┐
/// │ SafeZone │ ◄── depends on: Boundary (inset + label)
/// └────┬─────┘
///      ▼
/// ┌──────────┐
/// │   Grid   │ ◄── root, toggled by show_grid
/// └────┬─────┘
///      ▼
/// ┌───────────┐
/// │ Composite │ ◄── raster cache, depends on all three
/// └───────────┘
/// ```
#[derive(Default)]
pub struct GuidePipeline {
    pub boundary: Layer<BoundaryConfig>,
    pub safe_zone: Layer<SafeZoneConfig>,
    pub grid: Layer<GridConfig>,
    pub composite: CompositeLayer,
}

impl GuidePipeline {
    /// Builds the pipeline for a shape from engine settings.
    pub fn from_config(config: &EngineConfig, shape: Shape, show_grid: bool) -> Self {
        let color = config.guide_rgb();
        let mut pipeline = Self {
            boundary: Layer::with_config(BoundaryConfig::new(shape, color)),
            safe_zone: Layer::with_config(SafeZoneConfig::new(
                config.safe_margin,
                config.safe_zone_label.clone(),
                color,
            )),
            grid: Layer::with_config(GridConfig::new(config.grid_spacing, color)),
            composite: CompositeLayer::default(),
        };
        pipeline.grid.set_enabled(show_grid);
        pipeline
    }

    /// Switches the product outline. Returns true if anything changed.
    pub fn set_shape(&mut self, shape: Shape) -> bool {
        let Some(current) = self.boundary.config().cloned() else {
            return false;
        };
        self.boundary.set_config(Some(BoundaryConfig { shape, ..current }))
    }

    pub fn set_show_grid(&mut self, show: bool) -> bool {
        self.grid.set_enabled(show)
    }

    pub fn layer_versions(&self) -> LayerVersions {
        LayerVersions {
            boundary: self.boundary.version(),
            safe_zone: self.safe_zone.version(),
            grid: self.grid.version(),
        }
    }

    fn composite_dependencies(&self) -> DependencyVersion {
        DependencyVersion::combine(&[
            self.boundary.version(),
            self.safe_zone.version(),
            self.grid.version(),
        ])
    }

    /// Guide nodes for a canvas, in draw order.
    pub fn describe(&mut self, canvas: CanvasDimensions) -> Vec<SceneNode> {
        let mut ctx = RenderContext::new(canvas);
        let versions = self.layer_versions();
        self.boundary.apply(&mut ctx, &versions);
        self.safe_zone.apply(&mut ctx, &versions);
        self.grid.apply(&mut ctx, &versions);
        ctx.nodes
    }

    /// Rasterized guides at `multiplier` times the canvas size.
    ///
    /// Returns `None` if the guide SVG could not be rendered.
    pub fn rasterize(&mut self, canvas: CanvasDimensions, multiplier: f64) -> Option<RgbaImage> {
        let size = canvas.scaled(multiplier);
        let key = CacheKey::new(canvas.width, canvas.height, multiplier);
        let deps = self.composite_dependencies();

        if let Some(cached) = self.composite.get_cached(key, deps) {
            return Some(cached.clone());
        }

        let scene = Scene::new(self.describe(canvas), None);
        let svg = scene.guides_svg(size.width, size.height, multiplier);
        let raster = svg::render_svg(&svg, size.width, size.height)?;

        self.composite.store(key, raster.clone(), deps);
        Some(raster)
    }
}

// ============================================================================
// Color Utilities
// ============================================================================

/// Shifts the HSL lightness of a color by `amount` (negative darkens).
pub fn shift_lightness(color: Srgb<u8>, amount: f32) -> Srgb<u8> {
    let rgb: Srgb<f32> = color.into_format();
    let mut hsl: Hsl = rgb.into_color();
    hsl.lightness = (hsl.lightness + amount).clamp(0.0, 1.0);
    let shifted: Srgb<f32> = hsl.into_color();
    shifted.into_format()
}
