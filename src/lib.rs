//! print-placement: image placement and print-area constraints
//!
//! This crate positions a user-supplied image on a print canvas whose
//! proportions match a physical product (a 5x5 round sticker, a 2.5x3.5
//! card), keeps the image from being dragged out of view, draws print
//! guides over it, and exports the placed image as a high-resolution PNG.
//!
//! # Example
//!
//! ```
//! use print_placement::{
//!     Configurable, EngineConfig, Point, ProductArea, RenderSurface, Shape, SizeF, SourceHandle,
//! };
//! # fn png() -> Vec<u8> {
//! #     let img = image::RgbaImage::from_pixel(2000, 1000, image::Rgba([0, 0, 255, 255]));
//! #     let mut out = Vec::new();
//! #     img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
//! #     out
//! # }
//!
//! let product = ProductArea::parse_size("5x5", Shape::Round).unwrap();
//! let mut surface =
//!     RenderSurface::new(EngineConfig::default(), product, SizeF::new(800.0, 800.0)).unwrap();
//! assert_eq!(surface.canvas().width, 600);
//!
//! // The host fetches the bytes and completes the request.
//! let request = surface.set_source(Some(SourceHandle::url("photo.png"))).unwrap();
//! surface.complete_load(request.token, &png()).unwrap();
//!
//! // Gestures are clamped, never rejected.
//! surface.drag_to(Point::new(10_000.0, 300.0));
//! surface.scale_gesture(1.25);
//! surface.rotate_by(90.0);
//!
//! // Persist the placement, then export a print file.
//! let json = surface.commit().to_json().unwrap();
//! let export = surface.export_raster(3.0).unwrap();
//! assert_eq!((export.width, export.height), (1800, 1800));
//! # let _ = (json, surface.export_profile());
//! ```
//!
//! # Scene Reconciliation
//!
//! Hosts with a retained scene graph ask for the [`SceneDiff`] since the
//! last frame instead of redrawing everything:
//!
//! ```
//! use print_placement::{EngineConfig, ProductArea, RenderSurface, Shape, SizeF};
//!
//! let product = ProductArea::new(2.5, 3.5, Shape::Square).unwrap();
//! let mut surface = RenderSurface::new(EngineConfig::default(), product, SizeF::new(700.0, 700.0)).unwrap();
//!
//! let first = surface.reconcile();
//! assert!(!first.added.is_empty());
//!
//! surface.set_show_grid(true);
//! let diff = surface.reconcile();
//! assert!(diff.removed.is_empty());
//! ```

mod asset;
mod config;
mod error;
mod export;
mod fit;
mod geometry;
mod layer;
mod profile;
mod raster;
mod scene;
mod surface;
mod transform;
mod viewport;

pub use asset::{ImageAsset, SourceFormat, SourceHandle};
pub use config::{CanvasBounds, EngineConfig, ScaleLimits};
pub use error::{EngineError, Result};
pub use export::{ExportPreset, ExportedRaster, print_multiplier, render_export};
pub use fit::{
    Fit, PositionRange, clamp_user_scale, constrain_position, constrain_transform, fit_scale,
    fit_to_canvas, position_range, rescale_for_canvas,
};
pub use geometry::{CanvasDimensions, PixelSize, Point, ProductArea, Shape, SizeF};
pub use layer::{
    BoundaryConfig, CacheKey, GridConfig, GuideOutline, GuidePipeline, Layer, LayerConfig,
    LayerEffect, LayerVersions, RenderContext, SafeZoneConfig,
};
pub use profile::{NormalizedCenter, PlacementProfile, ProductSettings};
pub use scene::{Axis, NodeId, Outline, Reconciler, Scene, SceneDiff, SceneNode, Stroke};
pub use surface::{
    Configurable, EngineState, LoadRequest, LoadToken, RenderSurface, SurfaceEvent, SurfaceState,
};
pub use transform::{Transform, normalize_degrees};
pub use viewport::{canvas_for_product, compute_canvas_size};
