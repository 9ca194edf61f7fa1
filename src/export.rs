//! Print-ready raster export.
//!
//! Exports contain only the placed image, clipped to the product outline,
//! on a transparent background. Guides are a preview aid and never reach
//! the exported pixels.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::asset::ImageAsset;
use crate::error::{EngineError, Result};
use crate::geometry::{CanvasDimensions, ProductArea, Shape};
use crate::layer::GuideOutline;
use crate::raster;
use crate::transform::Transform;

// ============================================================================
// Presets
// ============================================================================

/// Named output multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ExportPreset {
    /// Canvas-sized output.
    Preview,
    /// Half-size output for listings.
    Thumbnail,
    /// Triple-size output for the print file.
    Print,
}

impl ExportPreset {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Preview => 1.0,
            Self::Thumbnail => 0.5,
            Self::Print => 3.0,
        }
    }
}

/// Multiplier that makes the exported width land exactly on `dpi` dots per
/// product unit.
///
/// ```
/// use print_placement::{print_multiplier, CanvasDimensions, ProductArea, Shape};
///
/// let product = ProductArea::new(5.0, 5.0, Shape::Round).unwrap();
/// let m = print_multiplier(&product, CanvasDimensions::new(600, 600), 300).unwrap();
/// assert_eq!(m, 2.5);
/// ```
pub fn print_multiplier(product: &ProductArea, canvas: CanvasDimensions, dpi: u32) -> Result<f64> {
    if canvas.width == 0 || dpi == 0 {
        return Err(EngineError::degenerate(format!(
            "print multiplier for {}px canvas at {dpi} dpi",
            canvas.width
        )));
    }
    Ok(product.width_units() * dpi as f64 / canvas.width as f64)
}

// ============================================================================
// ExportedRaster
// ============================================================================

/// An encoded export.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedRaster {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded RGBA pixels.
    pub png: Vec<u8>,
}

impl ExportedRaster {
    /// Encodes an RGBA image as PNG.
    pub fn encode(image: &RgbaImage) -> Result<Self> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    /// The export as a `data:image/png;base64,` URL, ready for upload.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

impl std::fmt::Debug for ExportedRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png", &format_args!("{} bytes", self.png.len()))
            .finish()
    }
}

/// Renders the export pixels for a placement.
///
/// Without a placed image the result is a transparent raster of the output
/// size.
pub fn render_export(
    placed: Option<(&ImageAsset, &Transform)>,
    canvas: CanvasDimensions,
    shape: Shape,
    multiplier: f64,
) -> Result<RgbaImage> {
    let Some((asset, transform)) = placed else {
        return raster::blank(canvas, multiplier);
    };
    let GuideOutline(clip) = GuideOutline::for_shape(shape, canvas);
    raster::render_image_layer(asset, transform, canvas, multiplier, Some(&clip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::SourceHandle;
    use crate::geometry::Point;
    use image::Rgba;

    fn asset(width: u32, height: u32) -> ImageAsset {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        ImageAsset::from_rgba(SourceHandle::url("fill"), &img).unwrap()
    }

    #[test]
    fn presets() {
        assert_eq!(ExportPreset::Preview.multiplier(), 1.0);
        assert_eq!(ExportPreset::Thumbnail.multiplier(), 0.5);
        assert_eq!(ExportPreset::Print.multiplier(), 3.0);
    }

    #[test]
    fn print_multiplier_rejects_zero() {
        let product = ProductArea::new(2.0, 3.0, Shape::Square).unwrap();
        assert!(print_multiplier(&product, CanvasDimensions::new(0, 10), 300).is_err());
        assert!(print_multiplier(&product, CanvasDimensions::new(400, 600), 0).is_err());
        assert_eq!(
            print_multiplier(&product, CanvasDimensions::new(400, 600), 300).unwrap(),
            1.5
        );
    }

    #[test]
    fn empty_export_is_transparent() {
        let canvas = CanvasDimensions::new(50, 40);
        let img = render_export(None, canvas, Shape::Square, 2.0).unwrap();
        assert_eq!(img.dimensions(), (100, 80));
        assert!(img.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn round_export_clips_corners() {
        let canvas = CanvasDimensions::new(100, 100);
        let asset = asset(100, 100);
        let transform = Transform::new(1.0, Point::new(50.0, 50.0), 0.0);

        let round = render_export(Some((&asset, &transform)), canvas, Shape::Round, 1.0).unwrap();
        assert_eq!(round.get_pixel(1, 1)[3], 0);
        assert!(round.get_pixel(50, 50)[3] > 250);

        let square = render_export(Some((&asset, &transform)), canvas, Shape::Square, 1.0).unwrap();
        assert!(square.get_pixel(5, 5)[3] > 250);
    }

    #[test]
    fn encoded_png_decodes_back() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255]));
        let raster = ExportedRaster::encode(&img).unwrap();
        assert_eq!((raster.width, raster.height), (7, 3));
        let decoded = image::load_from_memory(&raster.png).unwrap().to_rgba8();
        assert_eq!(decoded, img);
        assert!(raster.to_data_url().starts_with("data:image/png;base64,iVBOR"));
    }
}
