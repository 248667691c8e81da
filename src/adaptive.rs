//! Adaptive-quality encoding.
//!
//! Lossy encodes are retried at successively lower quality until the output
//! fits the caller's size budget or the quality floor is reached. The search
//! is a plain bounded loop, not recursion: each superseded attempt's bytes
//! are dropped before the next encode, so at most one candidate output is
//! alive at a time.

use crate::format::ImageFormat;
use crate::rasterizer::{Quality, Rasterizer, RasterizerError};
use log::debug;
use serde::Serialize;

/// Quality below which shrinking further is not worth the artifacts.
pub const QUALITY_FLOOR: f32 = 0.3;
/// Quality reduction per retry.
pub const QUALITY_STEP: f32 = 0.1;
/// Encode attempts per conversion, including the first.
pub const MAX_ATTEMPTS: u32 = 5;
/// AVIF encodes are expensive enough that the search starts no higher
/// than this, whatever the caller asked for.
pub const AVIF_INITIAL_QUALITY_CAP: f32 = 0.6;

/// What to encode and how hard to try.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSpec {
    pub format: ImageFormat,
    /// Starting quality for lossy targets; ignored for PNG.
    pub quality: Quality,
    /// Background fill the pipeline composites under transparent sources.
    /// Carried here so one spec describes the whole encode; the adaptive
    /// loop itself never reads it.
    pub background: Option<crate::rasterizer::Background>,
    /// Byte budget the output should fit, typically the source file size.
    /// `None` accepts the first attempt.
    pub size_budget: Option<u64>,
}

impl EncodeSpec {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            quality: Quality::DEFAULT,
            background: None,
            size_budget: None,
        }
    }
}

/// An encoded image, owned by the caller. Dropping it releases the bytes;
/// there is nothing else to release.
#[derive(Debug, Serialize)]
pub struct EncodedResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    /// Quality the accepted attempt used; `None` for lossless targets.
    pub achieved_quality: Option<Quality>,
    /// True when the search settled below the requested quality.
    pub quality_was_reduced: bool,
    pub format: ImageFormat,
}

/// Encode a rendered surface, lowering quality until the budget is met.
///
/// PNG bypasses the search entirely: one encode, no quality parameter.
/// Lossy formats get up to [`MAX_ATTEMPTS`] encodes, stepping quality down
/// by [`QUALITY_STEP`] after each over-budget attempt; the last attempt is
/// taken at [`QUALITY_FLOOR`] so an impossible budget still terminates
/// there. [`RasterizerError::EncodeUnsupported`] propagates to the caller,
/// which decides on a fallback format.
pub fn encode_adaptive<R: Rasterizer>(
    rasterizer: &R,
    surface: &R::Surface,
    width: u32,
    height: u32,
    spec: &EncodeSpec,
) -> Result<EncodedResult, RasterizerError> {
    if !spec.format.is_lossy() {
        let bytes = rasterizer.encode(surface, spec.format, None)?;
        return Ok(EncodedResult {
            byte_size: bytes.len() as u64,
            bytes,
            width,
            height,
            achieved_quality: None,
            quality_was_reduced: false,
            format: spec.format,
        });
    }

    let hint = spec.quality.value();
    let mut quality = if spec.format == ImageFormat::Avif {
        hint.min(AVIF_INITIAL_QUALITY_CAP)
    } else {
        hint
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        if attempt == MAX_ATTEMPTS {
            // Last try: go straight to the floor rather than wherever the
            // step sequence happens to be.
            quality = QUALITY_FLOOR;
        }

        let bytes = rasterizer.encode(surface, spec.format, Some(Quality::new(quality)))?;
        let byte_size = bytes.len() as u64;
        debug!(
            "encode attempt {attempt}/{MAX_ATTEMPTS}: {} at q={quality:.2} -> {byte_size} bytes",
            spec.format.mime_type()
        );

        let within_budget = spec.size_budget.is_none_or(|budget| byte_size <= budget);
        let at_floor = quality <= QUALITY_FLOOR + f32::EPSILON;

        if within_budget || at_floor || attempt >= MAX_ATTEMPTS {
            return Ok(EncodedResult {
                byte_size,
                bytes,
                width,
                height,
                achieved_quality: Some(Quality::new(quality)),
                quality_was_reduced: quality < hint,
                format: spec.format,
            });
        }

        // Over budget: this attempt's bytes drop here, before the retry.
        drop(bytes);
        quality = (quality - QUALITY_STEP).max(QUALITY_FLOOR);
    }
}
