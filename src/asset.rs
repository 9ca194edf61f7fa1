//! Image sources and decoded image assets.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use resvg::tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{EngineError, Result};
use crate::geometry::PixelSize;

// ============================================================================
// SourceHandle
// ============================================================================

/// Opaque identity of an image source.
///
/// Handles compare by value: supplying an equal handle twice is a no-op for
/// the render surface, even if the caller built a fresh handle object.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum SourceHandle {
    /// A URL or path the caller resolves to bytes itself.
    Url(String),
    /// Inline encoded image bytes.
    Bytes(Arc<[u8]>),
}

impl SourceHandle {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Builds an inline handle from a `data:image/...;base64,` URL.
    ///
    /// Only PNG and JPEG media types are accepted.
    ///
    /// ```
    /// use print_placement::SourceHandle;
    ///
    /// let handle = SourceHandle::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
    /// assert_eq!(handle.inline_bytes().unwrap()[..4], [0x89, b'P', b'N', b'G']);
    /// ```
    pub fn from_data_url(url: &str) -> Result<Self> {
        let invalid = |reason: &str| EngineError::InvalidDataUrl {
            reason: reason.to_string(),
        };
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("missing data: scheme"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing payload separator"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("payload is not base64"))?;
        match media_type.to_ascii_lowercase().as_str() {
            "image/png" | "image/jpeg" | "image/jpg" => {}
            other => return Err(invalid(&format!("unsupported media type {other:?}"))),
        }
        let bytes = STANDARD.decode(payload.trim())?;
        Ok(Self::Bytes(bytes.into()))
    }

    /// The encoded bytes carried by the handle, if it is inline.
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

// ============================================================================
// Format detection
// ============================================================================

/// Raster formats accepted at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    /// Detects the format from content, ignoring any file name.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

// ============================================================================
// ImageAsset
// ============================================================================

/// A decoded image ready to be drawn.
///
/// Pixels are kept premultiplied, the way the rasterizer consumes them, so a
/// frame never pays for conversion.
#[derive(Clone)]
pub struct ImageAsset {
    source: SourceHandle,
    pixmap: Pixmap,
}

impl ImageAsset {
    /// Decodes PNG or JPEG bytes.
    ///
    /// Fails with `DecodeFailure` for any other format or corrupt data, and
    /// with `DegenerateGeometry` for an image without pixels.
    pub fn decode(source: SourceHandle, bytes: &[u8]) -> Result<Self> {
        let format = SourceFormat::detect(bytes)
            .ok_or_else(|| EngineError::decode("only PNG and JPEG images are supported"))?;
        let decoded = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| EngineError::decode(e.to_string()))?
            .to_rgba8();
        Self::from_rgba(source, &decoded)
    }

    /// Wraps an already decoded RGBA image.
    pub fn from_rgba(source: SourceHandle, image: &image::RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| EngineError::degenerate(format!("image natural size {width}x{height}")))?;

        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or_else(|| EngineError::degenerate(format!("image natural size {width}x{height}")))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        Ok(Self { source, pixmap })
    }

    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    pub fn natural_size(&self) -> PixelSize {
        PixelSize::new(self.pixmap.width(), self.pixmap.height())
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("source", &self.source)
            .field("natural_size", &self.natural_size())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn decodes_png() {
        let bytes = png_bytes(20, 10, [255, 0, 0, 255]);
        let asset = ImageAsset::decode(SourceHandle::url("a.png"), &bytes).unwrap();
        assert_eq!(asset.natural_size(), PixelSize::new(20, 10));
        assert_eq!(asset.source(), &SourceHandle::url("a.png"));
    }

    #[test]
    fn decodes_jpeg() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 30]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg).unwrap();
        let asset = ImageAsset::decode(SourceHandle::url("a.jpg"), &out).unwrap();
        assert_eq!(asset.natural_size(), PixelSize::new(8, 8));
    }

    #[test]
    fn rejects_non_raster_sources() {
        let err = ImageAsset::decode(SourceHandle::url("x"), b"<svg></svg>").unwrap_err();
        assert!(matches!(err, EngineError::DecodeFailure { .. }));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = png_bytes(20, 10, [0, 0, 0, 255]);
        let err = ImageAsset::decode(SourceHandle::url("x"), &bytes[..40]).unwrap_err();
        assert!(matches!(err, EngineError::DecodeFailure { .. }));
    }

    #[test]
    fn premultiplies_pixels() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        let asset = ImageAsset::from_rgba(SourceHandle::url("p"), &img).unwrap();
        let px = asset.pixmap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() < 200);
    }

    #[test]
    fn handles_compare_by_value() {
        let a = SourceHandle::bytes(vec![1u8, 2, 3]);
        let b = SourceHandle::bytes(vec![1u8, 2, 3]);
        assert_eq!(a, b);
        assert_ne!(a, SourceHandle::url("1,2,3"));
        assert_eq!(format!("{a:?}"), "Bytes(3 bytes)");
    }

    #[test]
    fn data_url_round_trips_png() {
        let bytes = png_bytes(2, 2, [0, 0, 255, 255]);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let handle = SourceHandle::from_data_url(&url).unwrap();
        assert_eq!(handle.inline_bytes(), Some(bytes.as_slice()));
    }

    #[test]
    fn data_url_rejects_other_media() {
        let err = SourceHandle::from_data_url("data:image/gif;base64,R0lGOD").unwrap_err();
        assert!(matches!(err, EngineError::InvalidDataUrl { .. }));
        let err = SourceHandle::from_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, EngineError::Base64(_)));
        assert!(SourceHandle::from_data_url("https://example.com/a.png").is_err());
    }
}
