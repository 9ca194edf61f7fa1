//! SVG rasterization and pixel compositing helpers built on resvg.
//!
//! Guide overlays are emitted as SVG markup and rasterized here; the image
//! layer is drawn straight onto a tiny-skia pixmap by the rasterizer and
//! converted with [`pixmap_to_rgba_image`].

use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree, fontdb};

// ============================================================================
// SVG Rendering
// ============================================================================

/// System fonts, loaded once per process for guide captions.
fn font_database() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            log::debug!("loaded {} font faces for guide labels", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Renders an SVG document into a `width x height` RGBA image.
///
/// The document is stretched to the target size, so callers should emit a
/// `viewBox` matching the raster they ask for.
///
/// Returns `None` if the SVG cannot be parsed or the size is zero.
pub fn render_svg(svg_data: &str, width: u32, height: u32) -> Option<RgbaImage> {
    let mut opts = Options::default();
    opts.fontdb = font_database();
    let tree = match Tree::from_str(svg_data, &opts) {
        Ok(tree) => tree,
        Err(e) => {
            log::warn!("guide overlay SVG rejected: {e}");
            return None;
        }
    };

    let svg_size = tree.size();
    let sx = width as f32 / svg_size.width();
    let sy = height as f32 / svg_size.height();

    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Converts a premultiplied tiny-skia pixmap into a straight-alpha image.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Draws `src` over `dest` with its top-left corner at (`x`, `y`).
///
/// Fully transparent source pixels leave the destination untouched, so the
/// empty margin around a placed image never disturbs the guides beneath it.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let (dest_width, dest_height) = (dest.width() as i64, dest.height() as i64);

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        if src_pixel[3] == 0 {
            continue;
        }
        let (dx, dy) = (x as i64 + sx as i64, y as i64 + sy as i64);
        if !(0..dest_width).contains(&dx) || !(0..dest_height).contains(&dy) {
            continue;
        }
        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = alpha_blend(*src_pixel, *dst_pixel);
    }
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================
