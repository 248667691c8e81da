//! Output filename derivation.
//!
//! Converted files are named `{base}_{width}x{height}.{ext}` where `base`
//! is the source filename with its last extension stripped and `ext` comes
//! from the format actually encoded (which, after a fallback, may differ
//! from the one requested).

use crate::format::ImageFormat;

/// Source filename minus its last extension. Dotfiles and extension-less
/// names pass through whole.
pub fn base_name(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    }
}

/// Derive the download filename for a converted image.
pub fn derive_filename(original: &str, width: u32, height: u32, format: ImageFormat) -> String {
    format!(
        "{}_{}x{}.{}",
        base_name(original),
        width,
        height,
        format.extension()
    )
}
