//! Output size estimation.
//!
//! Everything here is advisory: the numbers feed a live preview, never the
//! actual encode. When the original file's size and dimensions are known the
//! estimate scales that real measurement by the pixel-count ratio and a pair
//! of hand-tuned multipliers; otherwise it falls back to flat per-format
//! compression ratios against the raw RGBA size. The multipliers are an
//! approximation with no claim of accuracy — real encoder output varies
//! wildly with content.

use crate::format::ImageFormat;
use crate::pipeline::SourceImage;
use serde::Serialize;

/// Estimates never report below this; a 1-pixel PNG still has headers.
const MIN_ESTIMATE_BYTES: u64 = 1024;

/// Size preview for a pending conversion. Recomputed on every settings
/// change, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub width: u32,
    pub height: u32,
    pub total_pixels: u64,
    /// Uncompressed RGBA baseline in bytes (`width * height * 4`).
    pub raw_size_bytes: u64,
    /// Human-readable form of `raw_size_bytes`.
    pub raw_size: String,
    pub estimated_bytes: u64,
    /// Human-readable form of `estimated_bytes`.
    pub estimated: String,
}

/// Predict the compressed output size for the given target dimensions,
/// format, and quality.
///
/// `original` supplies the reference-based strategy: the known source file
/// size scaled by pixel ratio. Without it a flat per-format heuristic
/// against the raw size is used. Quality is clamped to `[0.3, 1.0]` before
/// either branch, matching the floor the adaptive encoder enforces.
pub fn estimate_output_size(
    width: u32,
    height: u32,
    format: ImageFormat,
    quality: f32,
    original: Option<&SourceImage>,
) -> EstimationResult {
    let total_pixels = width as u64 * height as u64;
    let raw_size_bytes = total_pixels * 4;
    let quality = quality.clamp(0.3, 1.0) as f64;

    let estimated_bytes = match original {
        Some(info) if info.byte_length > 0 && info.width > 0 && info.height > 0 => {
            reference_estimate(total_pixels, format, quality, info)
        }
        _ => heuristic_estimate(raw_size_bytes, format, quality),
    };

    EstimationResult {
        width,
        height,
        total_pixels,
        raw_size_bytes,
        raw_size: format_byte_size(raw_size_bytes),
        estimated_bytes,
        estimated: format_byte_size(estimated_bytes),
    }
}

/// Scale the known source file size by the pixel-count ratio, then apply
/// per-format and per-quality multipliers plus cross-format penalties.
fn reference_estimate(
    total_pixels: u64,
    format: ImageFormat,
    quality: f64,
    info: &SourceImage,
) -> u64 {
    let original_pixels = info.width as u64 * info.height as u64;
    let pixel_ratio = total_pixels as f64 / original_pixels as f64;
    let base_size = info.byte_length as f64 * pixel_ratio;

    let mut format_multiplier = match format {
        ImageFormat::Jpeg => 1.0,
        ImageFormat::WebP => 0.9,
        ImageFormat::Avif => 1.15,
        ImageFormat::Png => 1.3,
        _ => 1.0,
    };

    // PNG has no quality axis at all.
    let quality_multiplier = if format == ImageFormat::Png {
        1.0
    } else {
        0.15 + quality
    };

    // Re-encoding a PNG source through a lossy codec usually costs more
    // than the pixel ratio suggests; JPEG artifacts also inflate AVIF.
    if info.format == ImageFormat::Png && format != ImageFormat::Png {
        format_multiplier *= if format == ImageFormat::Avif { 1.35 } else { 1.2 };
    } else if info.format == ImageFormat::Jpeg && format == ImageFormat::Avif {
        format_multiplier *= 1.25;
    }

    ((base_size * format_multiplier * quality_multiplier).round() as u64).max(MIN_ESTIMATE_BYTES)
}

/// Flat compression ratios against the raw RGBA size, linear in quality.
fn heuristic_estimate(raw_size_bytes: u64, format: ImageFormat, quality: f64) -> u64 {
    let compression_ratio = match format {
        ImageFormat::Jpeg => 0.1 + quality * 0.3,
        ImageFormat::Png => 0.3,
        ImageFormat::WebP => 0.08 + quality * 0.22,
        // Browser AVIF encoders vary a lot; lean high.
        ImageFormat::Avif => 0.07 + quality * 0.25,
        _ => 0.2,
    };
    (raw_size_bytes as f64 * compression_ratio).round() as u64
}

/// Format a byte count with binary units, e.g. `1536 → "1.5 KB"`.
pub fn format_byte_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    // Up to two decimals, trailing zeros dropped ("1.5 KB", not "1.50 KB").
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{} {}", rounded as u64, UNITS[exponent])
    } else {
        format!("{} {}", rounded, UNITS[exponent])
    }
}
