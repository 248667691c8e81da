//! Rasterizer trait and shared types.
//!
//! The [`Rasterizer`] trait defines the three pixel operations the pipeline
//! needs — decode, render, encode — plus an encode-support query. The
//! production implementation is
//! [`RustRasterizer`](crate::rust_rasterizer::RustRasterizer); tests use the
//! recording [`MockRasterizer`](tests::MockRasterizer) so pipeline logic can
//! be exercised without touching pixels.
//!
//! Bitmap and surface handles are associated types: the pipeline never
//! inspects them, it only threads them between calls.

use crate::format::ImageFormat;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterizerError {
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    #[error("encoding to {} is not supported", .0.mime_type())]
    EncodeUnsupported(ImageFormat),
    #[error("encode failed: {0}")]
    EncodeFailed(String),
}

/// Lossy encode quality in `[0.0, 1.0]`, clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Self {
        Self(if value.is_finite() { value.clamp(0.0, 1.0) } else { Self::DEFAULT.0 })
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub const DEFAULT: Quality = Quality(0.85);
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Opaque background fill composited under transparent sources when the
/// encode target cannot carry alpha information losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Background {
    pub const WHITE: Background = Background { r: 255, g: 255, b: 255 };

    /// Parse a `#rrggbb` hex color (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range| u8::from_str_radix(&hex[range], 16).ok();
        Some(Background {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

/// Result of a decode: an opaque bitmap handle plus its pixel dimensions.
#[derive(Debug)]
pub struct Decoded<B> {
    pub bitmap: B,
    pub width: u32,
    pub height: u32,
}

/// The pixel operations backing the conversion pipeline.
///
/// `decode` and `render` may be arbitrarily expensive; the pipeline calls
/// each at most once per conversion. `encode` is the only operation the
/// adaptive search calls repeatedly.
pub trait Rasterizer {
    /// Opaque decoded-image handle, produced by `decode`.
    type Bitmap;
    /// Opaque rendered-surface handle, produced by `render`.
    type Surface;

    /// Decode raw file bytes into a bitmap.
    fn decode(&self, bytes: &[u8]) -> Result<Decoded<Self::Bitmap>, RasterizerError>;

    /// Resample a bitmap to exact target dimensions, compositing an opaque
    /// background under it first when one is given.
    fn render(
        &self,
        bitmap: &Self::Bitmap,
        width: u32,
        height: u32,
        background: Option<Background>,
    ) -> Result<Self::Surface, RasterizerError>;

    /// Encode a rendered surface. `quality` is `None` for lossless targets.
    fn encode(
        &self,
        surface: &Self::Surface,
        format: ImageFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, RasterizerError>;

    /// Whether `encode` can produce this format at all. Cheap; answers
    /// from build configuration, not from a trial encode.
    fn supports_encode(&self, format: ImageFormat) -> bool;
}

/// Encode capabilities, probed once at startup and passed around explicitly.
///
/// The modern formats are the ones worth probing: PNG and JPEG encoders are
/// universal, while AVIF and WebP support depends on how the rasterizer was
/// built. Probing runs a real 1×1 trial encode per format, so a rasterizer
/// that claims support but fails in practice is still caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub avif_encode: bool,
    pub webp_encode: bool,
}

impl Capabilities {
    pub fn probe<R: Rasterizer>(rasterizer: &R) -> Self {
        Self {
            avif_encode: trial_encode(rasterizer, ImageFormat::Avif),
            webp_encode: trial_encode(rasterizer, ImageFormat::WebP),
        }
    }

    /// Whether the given target format can be encoded.
    pub fn can_encode(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Avif => self.avif_encode,
            ImageFormat::WebP => self.webp_encode,
            ImageFormat::Jpeg | ImageFormat::Png => true,
            ImageFormat::Gif => false,
        }
    }
}

/// Encode a 1×1 white surface and see whether anything comes out.
fn trial_encode<R: Rasterizer>(rasterizer: &R, format: ImageFormat) -> bool {
    if !rasterizer.supports_encode(format) {
        return false;
    }
    // A solid 1x1 PNG, decoded and re-encoded through the rasterizer
    // itself so the probe exercises the same code path conversions use.
    let result: Result<(), RasterizerError> = (|| {
        let decoded = rasterizer.decode(ONE_PIXEL_PNG)?;
        let surface = rasterizer.render(&decoded.bitmap, 1, 1, None)?;
        rasterizer.encode(&surface, format, Some(Quality::new(0.5)))?;
        Ok(())
    })();
    if result.is_err() {
        warn!("{} encode probe failed; conversions will fall back", format.mime_type());
    }
    result.is_ok()
}

/// Smallest PNG we can carry without an encoder on hand: 1×1 white, RGB8.
static ONE_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // signature
    0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R', // IHDR
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE,
    0x00, 0x00, 0x00, 0x0C, b'I', b'D', b'A', b'T', // IDAT
    0x08, 0xD7, 0x63, 0xF8, 0xFF, 0xFF, 0x3F, 0x00,
    0x05, 0xFE, 0x02, 0xFE, 0xDC, 0xCC, 0x59, 0xE7,
    0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', // IEND
    0xAE, 0x42, 0x60, 0x82,
];
