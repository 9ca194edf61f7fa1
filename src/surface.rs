//! The render surface: one placement session for one product.
//!
//! A [`RenderSurface`] owns the whole [`EngineState`] and is the only thing
//! that mutates it. Inputs (product, container, source, gestures) go in as
//! method calls; notifications come out as [`SurfaceEvent`]s drained by the
//! host.
//!
//! # Loading
//!
//! Decoding is driven by the host. [`set_source`](RenderSurface::set_source)
//! hands back a [`LoadRequest`] carrying a token; the host fetches the bytes
//! and calls [`complete_load`](RenderSurface::complete_load) with the same
//! token. Only the latest token is honored, so a slow response for an old
//! source can never overwrite a newer one.
//!
//! ```
//! use print_placement::{EngineConfig, ProductArea, RenderSurface, Shape, SizeF, SourceHandle};
//! # fn png() -> Vec<u8> {
//! #     let img = image::RgbaImage::from_pixel(40, 20, image::Rgba([255, 0, 0, 255]));
//! #     let mut out = Vec::new();
//! #     img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
//! #     out
//! # }
//!
//! let product = ProductArea::new(5.0, 5.0, Shape::Round).unwrap();
//! let mut surface =
//!     RenderSurface::new(EngineConfig::default(), product, SizeF::new(800.0, 800.0)).unwrap();
//!
//! let request = surface.set_source(Some(SourceHandle::url("art.png"))).unwrap();
//! surface.complete_load(request.token, &png()).unwrap();
//! assert!(surface.is_ready());
//!
//! let export = surface.export_raster(2.0).unwrap();
//! assert_eq!((export.width, export.height), (1200, 1200));
//! ```

use image::RgbaImage;

use crate::asset::{ImageAsset, SourceHandle};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::export::{self, ExportPreset, ExportedRaster};
use crate::fit;
use crate::geometry::{CanvasDimensions, PixelSize, Point, ProductArea, SizeF};
use crate::layer::GuidePipeline;
use crate::layer::svg::composite_over;
use crate::profile::{NormalizedCenter, PlacementProfile, ProductSettings};
use crate::raster;
use crate::scene::{Reconciler, Scene, SceneDiff, SceneNode};
use crate::transform::Transform;
use crate::viewport;

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be configured from a [`PlacementProfile`].
pub trait Configurable {
    /// Applies a profile's placement to this instance.
    fn apply_profile(&mut self, profile: &PlacementProfile) -> Result<()>;

    /// Exports the current placement as a profile.
    fn export_profile(&self) -> PlacementProfile;
}

// ============================================================================
// State
// ============================================================================

/// Identifies one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A decode the host has to fulfil.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: LoadToken,
    pub source: SourceHandle,
}

impl LoadRequest {
    /// Bytes the host can hand straight back for inline sources.
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        self.source.inline_bytes()
    }
}

/// Lifecycle of the surface's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    /// No source supplied.
    Empty,
    /// Waiting for the host to complete `token`.
    Loading { token: LoadToken },
    /// An image is placed.
    Ready,
    /// The last load failed; a new source recovers.
    Failed { message: String },
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Emitted once on construction, before any image.
    SurfaceReady,
    AssetLoaded { natural: PixelSize },
    LoadFailed { message: String },
    TransformCommitted(PlacementProfile),
    /// The source was withdrawn and the image released.
    Cleared,
}

/// Everything the engine knows about the current placement.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub product: ProductArea,
    /// Raw container size supplied by the host, before padding.
    pub container: SizeF,
    pub canvas: CanvasDimensions,
    /// Scale at which the image fits the canvas. Zero without an image.
    pub fit_scale: f64,
    /// Zoom relative to the fit scale.
    pub user_scale: f64,
    /// `None` until an image is placed.
    pub transform: Option<Transform>,
    pub show_grid: bool,
}

// ============================================================================
// RenderSurface
// ============================================================================

/// Interactive placement of one image on one product.
pub struct RenderSurface {
    config: EngineConfig,
    state: EngineState,
    status: SurfaceState,
    asset: Option<ImageAsset>,
    /// Source currently loaded or being loaded.
    desired_source: Option<SourceHandle>,
    next_token: u64,
    /// Placement to restore once the pending image arrives.
    pending_profile: Option<PlacementProfile>,
    committed: Option<PlacementProfile>,
    guides: GuidePipeline,
    reconciler: Reconciler,
    events: Vec<SurfaceEvent>,
}

impl RenderSurface {
    /// Creates a surface for `product` inside a host container of
    /// `container` pixels.
    pub fn new(config: EngineConfig, product: ProductArea, container: SizeF) -> Result<Self> {
        let config = config.sanitized();
        let container = container.sanitized();
        let canvas = layout(&config, &product, container)?;
        let guides = GuidePipeline::from_config(&config, product.shape(), false);

        log::debug!(
            "surface ready: {}x{} {:?} product on {}x{} canvas",
            product.width_units(),
            product.height_units(),
            product.shape(),
            canvas.width,
            canvas.height
        );

        Ok(Self {
            config,
            state: EngineState {
                product,
                container,
                canvas,
                fit_scale: 0.0,
                user_scale: 1.0,
                transform: None,
                show_grid: false,
            },
            status: SurfaceState::Empty,
            asset: None,
            desired_source: None,
            next_token: 0,
            pending_profile: None,
            committed: None,
            guides,
            reconciler: Reconciler::new(),
            events: vec![SurfaceEvent::SurfaceReady],
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn status(&self) -> &SurfaceState {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == SurfaceState::Ready
    }

    pub fn canvas(&self) -> CanvasDimensions {
        self.state.canvas
    }

    pub fn product(&self) -> &ProductArea {
        &self.state.product
    }

    pub fn transform(&self) -> Option<Transform> {
        self.state.transform
    }

    pub fn user_scale(&self) -> f64 {
        self.state.user_scale
    }

    pub fn fit_scale(&self) -> f64 {
        self.state.fit_scale
    }

    pub fn show_grid(&self) -> bool {
        self.state.show_grid
    }

    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_ref()
    }

    /// The last placement recorded by [`commit`](Self::commit).
    pub fn committed(&self) -> Option<&PlacementProfile> {
        self.committed.as_ref()
    }

    /// Takes all pending notifications.
    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Geometry inputs
    // ------------------------------------------------------------------------

    /// Switches product. A placed image keeps its relative position and
    /// zoom; it is not refit.
    pub fn set_product_area(&mut self, product: ProductArea) -> Result<()> {
        if product == self.state.product {
            return Ok(());
        }
        let canvas = layout(&self.config, &product, self.state.container)?;
        self.state.product = product;
        self.guides.set_shape(product.shape());
        self.relayout(canvas)
    }

    /// Updates the host container size. Same rescale rules as a product
    /// change.
    pub fn set_container(&mut self, container: SizeF) -> Result<()> {
        let container = container.sanitized();
        if container == self.state.container {
            return Ok(());
        }
        let canvas = layout(&self.config, &self.state.product, container)?;
        self.state.container = container;
        self.relayout(canvas)
    }

    /// Replaces the engine settings, rebuilding the guides and re-deriving
    /// the canvas.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<()> {
        let config = config.sanitized();
        let canvas = layout(&config, &self.state.product, self.state.container)?;
        self.guides =
            GuidePipeline::from_config(&config, self.state.product.shape(), self.state.show_grid);
        self.config = config;
        self.state.user_scale = fit::clamp_user_scale(self.state.user_scale, self.config.scale_limits);
        self.relayout(canvas)
    }

    /// Moves to a new canvas, rescaling a placed image proportionally.
    fn relayout(&mut self, canvas: CanvasDimensions) -> Result<()> {
        let old = self.state.canvas;
        if let (Some(asset), Some(transform)) = (&self.asset, self.state.transform) {
            let natural = asset.natural_size();
            let fit_scale = fit::fit_scale(canvas, natural, self.config.fit_margin)?;
            let mut next =
                fit::rescale_for_canvas(&transform, old, canvas, fit_scale, self.state.user_scale);
            fit::constrain_transform(canvas, natural, &mut next, self.config.min_visible_fraction);
            self.state.fit_scale = fit_scale;
            self.state.transform = Some(next);
        }
        if old != canvas {
            log::debug!(
                "canvas {}x{} -> {}x{}",
                old.width,
                old.height,
                canvas.width,
                canvas.height
            );
        }
        self.state.canvas = canvas;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Supplies or withdraws the image source.
    ///
    /// A source equal to the one loaded or loading is a no-op and returns
    /// `None`. A new source releases the current image at once and returns
    /// the request the host must complete.
    pub fn set_source(&mut self, source: Option<SourceHandle>) -> Option<LoadRequest> {
        let Some(source) = source else {
            self.clear();
            return None;
        };
        if self.desired_source.as_ref() == Some(&source) {
            return None;
        }

        self.next_token += 1;
        let token = LoadToken(self.next_token);
        self.release_asset();
        self.desired_source = Some(source.clone());
        self.status = SurfaceState::Loading { token };
        log::debug!("load {} requested for {source:?}", token.get());

        Some(LoadRequest { token, source })
    }

    fn clear(&mut self) {
        let had_anything = self.desired_source.is_some() || self.asset.is_some();
        self.release_asset();
        self.desired_source = None;
        self.pending_profile = None;
        self.status = SurfaceState::Empty;
        if had_anything {
            log::debug!("source withdrawn");
            self.events.push(SurfaceEvent::Cleared);
        }
    }

    fn release_asset(&mut self) {
        self.asset = None;
        self.state.transform = None;
        self.state.fit_scale = 0.0;
    }

    fn check_token(&self, token: LoadToken) -> Result<()> {
        match self.status {
            SurfaceState::Loading { token: current } if current == token => Ok(()),
            _ => {
                log::warn!("dropping stale completion for load {}", token.get());
                Err(EngineError::StaleCompletion { token: token.get() })
            }
        }
    }

    /// Completes a load with the fetched bytes.
    ///
    /// Returns `StaleCompletion` without touching anything if `token` is
    /// not the latest request. On decode failure the surface moves to
    /// [`SurfaceState::Failed`] and the error is returned.
    pub fn complete_load(&mut self, token: LoadToken, bytes: &[u8]) -> Result<()> {
        self.check_token(token)?;
        let Some(source) = self.desired_source.clone() else {
            return Err(EngineError::StaleCompletion { token: token.get() });
        };

        let placed = ImageAsset::decode(source, bytes).and_then(|asset| {
            let natural = asset.natural_size();
            let fit = fit::fit_to_canvas(self.state.canvas, natural, self.config.fit_margin, 0.0)?;
            Ok((asset, fit))
        });
        let (asset, fit) = match placed {
            Ok(placed) => placed,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let natural = asset.natural_size();
        self.asset = Some(asset);
        self.state.fit_scale = fit.fit_scale;
        self.state.user_scale = 1.0;
        self.state.transform = Some(fit.transform);
        self.status = SurfaceState::Ready;

        if let Some(profile) = self.pending_profile.take() {
            self.restore_placement(&profile);
        }

        log::debug!(
            "load {} ready: {}x{} at fit scale {:.4}",
            token.get(),
            natural.width,
            natural.height,
            fit.fit_scale
        );
        self.events.push(SurfaceEvent::AssetLoaded { natural });
        Ok(())
    }

    /// Completes a load the host could not fetch.
    pub fn fail_load(&mut self, token: LoadToken, reason: impl Into<String>) -> Result<()> {
        self.check_token(token)?;
        let err = EngineError::decode(reason);
        self.fail(&err);
        Err(err)
    }

    fn fail(&mut self, err: &EngineError) {
        let message = err.to_string();
        log::warn!("image load failed: {message}");
        self.release_asset();
        // Forget the source so supplying it again retries.
        self.desired_source = None;
        self.status = SurfaceState::Failed {
            message: message.clone(),
        };
        self.events.push(SurfaceEvent::LoadFailed { message });
    }

    // ------------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------------

    fn natural(&self) -> Option<PixelSize> {
        self.asset.as_ref().map(ImageAsset::natural_size)
    }

    /// Re-applies the visibility clamp after any change.
    fn constrain(&mut self) {
        let (Some(natural), Some(transform)) = (self.natural(), self.state.transform.as_mut())
        else {
            return;
        };
        let wanted = transform.center();
        fit::constrain_transform(
            self.state.canvas,
            natural,
            transform,
            self.config.min_visible_fraction,
        );
        if transform.center() != wanted {
            log::trace!(
                "center clamped ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                wanted.x,
                wanted.y,
                transform.center_x(),
                transform.center_y()
            );
        }
    }

    /// Moves the image center, clamped to keep it visible.
    pub fn drag_to(&mut self, center: Point) {
        let Some(transform) = self.state.transform.as_mut() else {
            return;
        };
        transform.set_center(center);
        self.constrain();
    }

    pub fn drag_by(&mut self, dx: f64, dy: f64) {
        let Some(current) = self.state.transform.map(|t| t.center()) else {
            return;
        };
        self.drag_to(Point::new(current.x + dx, current.y + dy));
    }

    /// Sets the zoom relative to fit-to-canvas.
    pub fn set_user_scale(&mut self, user_scale: f64) {
        let clamped = fit::clamp_user_scale(user_scale, self.config.scale_limits);
        if clamped != user_scale {
            log::trace!("user scale {user_scale} clamped to {clamped}");
        }
        self.state.user_scale = clamped;
        if let Some(transform) = self.state.transform.as_mut() {
            transform.set_scale(self.state.fit_scale * clamped);
        }
        self.constrain();
    }

    /// Multiplies the zoom, as a pinch or wheel gesture does.
    pub fn scale_gesture(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.set_user_scale(self.state.user_scale * factor);
    }

    /// Turning changes the footprint on screen, so the center is
    /// re-clamped.
    pub fn set_rotation(&mut self, degrees: f64) {
        if let Some(transform) = self.state.transform.as_mut() {
            transform.set_angle(degrees);
        }
        self.constrain();
    }

    pub fn rotate_by(&mut self, degrees: f64) {
        if let Some(transform) = self.state.transform.as_mut() {
            transform.rotate_by(degrees);
        }
        self.constrain();
    }

    /// Refits and centers the image, clearing rotation and zoom.
    pub fn reset(&mut self) {
        self.refit(0.0);
    }

    /// Refits and centers the image, keeping its rotation.
    pub fn fit_to_canvas(&mut self) {
        let angle = self.state.transform.map_or(0.0, |t| t.angle_degrees());
        self.refit(angle);
    }

    fn refit(&mut self, angle: f64) {
        let Some(natural) = self.natural() else {
            return;
        };
        match fit::fit_to_canvas(self.state.canvas, natural, self.config.fit_margin, angle) {
            Ok(fit) => {
                self.state.fit_scale = fit.fit_scale;
                self.state.user_scale = 1.0;
                self.state.transform = Some(fit.transform);
            }
            // Decoded assets always have pixels.
            Err(e) => log::warn!("refit skipped: {e}"),
        }
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.state.show_grid = show;
        if self.guides.set_show_grid(show) {
            log::debug!("grid {}", if show { "shown" } else { "hidden" });
        }
    }

    /// Records the current placement and announces it.
    pub fn commit(&mut self) -> PlacementProfile {
        let profile = self.export_profile();
        self.committed = Some(profile.clone());
        self.events
            .push(SurfaceEvent::TransformCommitted(profile.clone()));
        profile
    }

    // ------------------------------------------------------------------------
    // Scene
    // ------------------------------------------------------------------------

    /// The scene for the current state: guides, then the image on top.
    pub fn scene(&mut self) -> Scene {
        let guides = self.guides.describe(self.state.canvas);
        let image = match (&self.asset, self.state.transform) {
            (Some(asset), Some(transform)) => Some(SceneNode::Image {
                source: asset.source().clone(),
                natural: asset.natural_size(),
                transform,
            }),
            _ => None,
        };
        Scene::new(guides, image)
    }

    /// Changes since the last reconcile.
    pub fn reconcile(&mut self) -> SceneDiff {
        let scene = self.scene();
        self.reconciler.reconcile(&scene)
    }

    /// Forgets what the host has drawn, for when its scene graph was torn
    /// down. The next [`reconcile`](Self::reconcile) adds every node again.
    pub fn invalidate_scene(&mut self) {
        log::debug!("scene invalidated by host");
        self.reconciler.clear();
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    fn placed(&self) -> Option<(&ImageAsset, &Transform)> {
        self.asset.as_ref().zip(self.state.transform.as_ref())
    }

    /// On-screen preview: guides with the unclipped image drawn over them.
    pub fn render_preview(&mut self, multiplier: f64) -> Result<RgbaImage> {
        let size = raster::output_size(self.state.canvas, multiplier)?;
        let mut frame = match self.guides.rasterize(self.state.canvas, multiplier) {
            Some(guides) => guides,
            None => {
                log::warn!("guide overlay unavailable, previewing image only");
                RgbaImage::new(size.width, size.height)
            }
        };
        if let Some((asset, transform)) = self.placed() {
            let layer =
                raster::render_image_layer(asset, transform, self.state.canvas, multiplier, None)?;
            composite_over(&mut frame, &layer, 0, 0);
        }
        Ok(frame)
    }

    /// Encodes the print raster at `multiplier` times the canvas size.
    pub fn export_raster(&self, multiplier: f64) -> Result<ExportedRaster> {
        let pixels = export::render_export(
            self.placed(),
            self.state.canvas,
            self.state.product.shape(),
            multiplier,
        )?;
        let raster = ExportedRaster::encode(&pixels)?;
        log::debug!(
            "exported {}x{} at x{multiplier} ({} bytes)",
            raster.width,
            raster.height,
            raster.png.len()
        );
        Ok(raster)
    }

    pub fn export_preset(&self, preset: ExportPreset) -> Result<ExportedRaster> {
        self.export_raster(preset.multiplier())
    }

    /// Exports at the configured print DPI.
    pub fn export_for_print(&self) -> Result<ExportedRaster> {
        let multiplier =
            export::print_multiplier(&self.state.product, self.state.canvas, self.config.print_dpi)?;
        self.export_raster(multiplier)
    }

    // ------------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------------

    fn restore_placement(&mut self, profile: &PlacementProfile) {
        let Some(transform) = self.state.transform.as_mut() else {
            return;
        };
        let user_scale = fit::clamp_user_scale(profile.user_scale, self.config.scale_limits);
        self.state.user_scale = user_scale;
        *transform = Transform::new(
            self.state.fit_scale * user_scale,
            profile.center.to_point(self.state.canvas),
            profile.rotation_degrees,
        );
        self.constrain();
    }
}

impl Configurable for RenderSurface {
    /// Restores a placement.
    ///
    /// Product and grid apply at once. The transform applies to the placed
    /// image, or is held until the pending image finishes loading.
    fn apply_profile(&mut self, profile: &PlacementProfile) -> Result<()> {
        if let Some(settings) = profile.product {
            self.set_product_area(ProductArea::try_from(settings)?)?;
        }
        self.set_show_grid(profile.show_grid);

        match self.status {
            SurfaceState::Ready => self.restore_placement(profile),
            SurfaceState::Loading { .. } => self.pending_profile = Some(profile.clone()),
            SurfaceState::Empty | SurfaceState::Failed { .. } => {}
        }
        Ok(())
    }

    fn export_profile(&self) -> PlacementProfile {
        let (rotation_degrees, center) = match self.state.transform {
            Some(t) => (
                t.angle_degrees(),
                NormalizedCenter::from_point(t.center(), self.state.canvas),
            ),
            None => (0.0, NormalizedCenter::CENTERED),
        };
        PlacementProfile {
            product: Some(ProductSettings::from(&self.state.product)),
            user_scale: self.state.user_scale,
            rotation_degrees,
            center,
            show_grid: self.state.show_grid,
        }
    }
}

/// Canvas for a product inside a raw container, after padding.
fn layout(config: &EngineConfig, product: &ProductArea, container: SizeF) -> Result<CanvasDimensions> {
    viewport::canvas_for_product(
        product,
        container.inset(config.container_padding),
        config.canvas_bounds,
    )
}

// ============================================================================
// Tests
// ============================================================================
