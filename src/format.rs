//! Image format identification.
//!
//! Formats are resolved from a declared MIME type when one is present and
//! trustworthy, falling back to the filename extension. Browsers (and some
//! filesystems) report `application/octet-stream` for perfectly valid images,
//! so the declared type is never the only signal.

use serde::{Deserialize, Serialize};

/// The image formats the pipeline knows how to handle.
///
/// All five are accepted as input; GIF is decode-only (single frame) and is
/// never an encode target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Avif,
}

/// Extension-to-format table. `jpg`/`jpeg` both map to JPEG.
const EXTENSION_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("avif", ImageFormat::Avif),
];

impl ImageFormat {
    /// The canonical MIME type, e.g. `image/jpeg`.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Avif => "image/avif",
        }
    }

    /// The file extension used when deriving output filenames.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
            ImageFormat::Avif => "avif",
        }
    }

    /// Parse a MIME type, tolerating case and surrounding whitespace.
    /// `image/jpg` is accepted as an alias for `image/jpeg`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            "image/avif" => Some(ImageFormat::Avif),
            _ => None,
        }
    }

    /// Infer the format from a filename's last extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
        if ext.len() == filename.len() {
            // No dot at all.
            return None;
        }
        EXTENSION_CANDIDATES
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
    }

    /// Whether encoding in this format discards information. Lossy targets
    /// take a quality parameter and participate in the adaptive search.
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Avif)
    }

    /// Whether the format can carry an alpha channel. Sources in these
    /// formats get a background fill composited under them when the encode
    /// target is lossy.
    pub fn supports_transparency(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

/// Resolve a file's format from its declared MIME type or, failing that,
/// its filename extension.
///
/// A declared `application/octet-stream` is treated as absent: it is the
/// generic "no idea" type and the extension is a better signal.
pub fn resolve_format(declared_type: Option<&str>, filename: &str) -> Option<ImageFormat> {
    if let Some(declared) = declared_type {
        let normalized = declared.trim().to_ascii_lowercase();
        if !normalized.is_empty() && normalized != "application/octet-stream" {
            return ImageFormat::from_mime_type(&normalized);
        }
    }
    ImageFormat::from_filename(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_roundtrip_for_all_formats() {
        for format in [
            ImageFormat::Jpeg,
            ImageFormat::Png,
            ImageFormat::WebP,
            ImageFormat::Gif,
            ImageFormat::Avif,
        ] {
            assert_eq!(ImageFormat::from_mime_type(format.mime_type()), Some(format));
        }
    }

    #[test]
    fn jpg_alias_and_case_tolerated() {
        assert_eq!(ImageFormat::from_mime_type("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime_type(" IMAGE/PNG "), Some(ImageFormat::Png));
    }

    #[test]
    fn unknown_mime_rejected() {
        assert_eq!(ImageFormat::from_mime_type("image/tiff"), None);
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn extension_inference() {
        assert_eq!(ImageFormat::from_filename("photo.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_filename("a.b.webp"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_filename("archive.zip"), None);
        assert_eq!(ImageFormat::from_filename("noextension"), None);
    }

    #[test]
    fn declared_type_wins_over_extension() {
        assert_eq!(
            resolve_format(Some("image/png"), "misnamed.jpg"),
            Some(ImageFormat::Png)
        );
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        assert_eq!(
            resolve_format(Some("application/octet-stream"), "photo.gif"),
            Some(ImageFormat::Gif)
        );
        assert_eq!(resolve_format(Some(""), "photo.avif"), Some(ImageFormat::Avif));
    }

    #[test]
    fn bogus_declared_type_does_not_fall_back() {
        // A concrete-but-unsupported declared type is an answer, not an
        // absence: the file claims to be something we cannot decode.
        assert_eq!(resolve_format(Some("image/tiff"), "scan.png"), None);
    }

    #[test]
    fn transparency_and_lossiness() {
        assert!(ImageFormat::Png.supports_transparency());
        assert!(!ImageFormat::Jpeg.supports_transparency());
        assert!(ImageFormat::Avif.is_lossy());
        assert!(!ImageFormat::Png.is_lossy());
    }
}
