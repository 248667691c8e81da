//! The conversion pipeline.
//!
//! Orchestrates one conversion end to end: validate the raw file, decode it
//! through the rasterizer, flag animated GIFs, compute target dimensions,
//! render, then adaptively encode. Each stage is a plain sequential call —
//! the pipeline does no work in parallel with itself, and holds a busy flag
//! so a second conversion cannot start while one is in flight.
//!
//! Encode-format availability is probed once at construction and carried in
//! an explicit [`Capabilities`] value rather than process-global state. When
//! the rasterizer refuses the requested encode format outright, the pipeline
//! falls back to PNG and reports the substitution on the returned
//! [`Conversion`] instead of failing the request.

use crate::adaptive::{EncodeSpec, EncodedResult, encode_adaptive};
use crate::dimensions::{Dimensions, ResizeSpec, aspect_ratio_label, compute_target_size};
use crate::estimate::format_byte_size;
use crate::format::{ImageFormat, resolve_format};
use crate::gif::is_animated_gif;
use crate::naming::derive_filename;
use crate::rasterizer::{Capabilities, Rasterizer, RasterizerError};
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Files above this are rejected before any decoding happens.
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Rejection reasons for a file that never makes it into the pipeline.
/// [`ValidationError::code`] gives the machine-readable form a UI layer
/// keys its messages on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file provided")]
    NoFile,
    #[error("file is {size} bytes, larger than the 20 MB limit")]
    FileTooLarge { size: u64 },
    #[error("unsupported format: {detail}")]
    UnsupportedFormat { detail: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::NoFile => "no_file",
            ValidationError::FileTooLarge { .. } => "file_too_large",
            ValidationError::UnsupportedFormat { .. } => "unsupported_format",
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not decode image: {0}")]
    Decode(#[source] RasterizerError),
    #[error("could not encode image: {0}")]
    Encode(#[source] RasterizerError),
    #[error("a conversion is already in progress")]
    Busy,
}

/// A raw input file before validation.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// MIME type as declared by the origin (browser, OS), if any.
    pub declared_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            bytes,
        }
    }

    /// Read a source file from disk, typed by its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, std::fs::read(path)?))
    }
}

/// Metadata for a successfully decoded source image. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceImage {
    pub filename: String,
    pub byte_length: u64,
    /// Human-readable form of `byte_length`.
    pub formatted_size: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Reduced "W:H" label, e.g. "16:9".
    pub aspect_ratio: String,
    /// True only for GIF sources with more than one frame.
    pub is_animated: bool,
}

/// A decoded source: the rasterizer's bitmap handle plus its metadata.
/// Dropping it releases the decoded pixels.
#[derive(Debug)]
pub struct LoadedImage<B> {
    pub bitmap: B,
    pub info: SourceImage,
}

/// The outcome of one conversion, owned by the caller. Dropping it releases
/// the encoded bytes.
#[derive(Debug, Serialize)]
pub struct Conversion {
    pub output: EncodedResult,
    /// Suggested download filename, `{base}_{w}x{h}.{ext}` of the actual
    /// output format.
    pub filename: String,
    /// Format the caller asked for. Differs from `output.format` after a
    /// PNG fallback.
    pub requested_format: ImageFormat,
}

impl Conversion {
    /// True when the requested format was unavailable and PNG was encoded
    /// instead. Callers surface this to the user; it is never silent.
    pub fn format_substituted(&self) -> bool {
        self.requested_format != self.output.format
    }
}

/// One-at-a-time image conversion over a rasterizer.
pub struct ConversionPipeline<R: Rasterizer> {
    rasterizer: R,
    capabilities: Capabilities,
    in_flight: AtomicBool,
}

/// Clears the busy flag on every exit path out of `convert`.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: Rasterizer> ConversionPipeline<R> {
    /// Build a pipeline, probing the rasterizer's encode capabilities once.
    pub fn new(rasterizer: R) -> Self {
        let capabilities = Capabilities::probe(&rasterizer);
        Self {
            rasterizer,
            capabilities,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Encode capabilities probed at construction.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Check a raw file before any decoding: present, within the size
    /// limit, and of a recognizable image format.
    pub fn validate(&self, file: &SourceFile) -> Result<ImageFormat, ValidationError> {
        if file.bytes.is_empty() {
            return Err(ValidationError::NoFile);
        }
        let size = file.bytes.len() as u64;
        if size > MAX_FILE_SIZE {
            return Err(ValidationError::FileTooLarge { size });
        }
        resolve_format(file.declared_type.as_deref(), &file.name).ok_or_else(|| {
            ValidationError::UnsupportedFormat {
                detail: file
                    .declared_type
                    .clone()
                    .unwrap_or_else(|| file.name.clone()),
            }
        })
    }

    /// Validate and decode a file into a reusable [`LoadedImage`].
    ///
    /// GIF sources additionally get the animation scan; a malformed GIF
    /// never fails here, it just reads as not animated.
    pub fn load(&self, file: &SourceFile) -> Result<LoadedImage<R::Bitmap>, PipelineError> {
        let format = self.validate(file)?;

        let decoded = self
            .rasterizer
            .decode(&file.bytes)
            .map_err(PipelineError::Decode)?;

        let is_animated = format == ImageFormat::Gif && is_animated_gif(&file.bytes);

        let info = SourceImage {
            filename: file.name.clone(),
            byte_length: file.bytes.len() as u64,
            formatted_size: format_byte_size(file.bytes.len() as u64),
            format,
            width: decoded.width,
            height: decoded.height,
            aspect_ratio: aspect_ratio_label(decoded.width, decoded.height),
            is_animated,
        };
        debug!(
            "loaded {} ({}x{} {}, animated: {})",
            info.filename, info.width, info.height, info.formatted_size, info.is_animated
        );

        Ok(LoadedImage {
            bitmap: decoded.bitmap,
            info,
        })
    }

    /// Convert a loaded image: compute dimensions, render, encode.
    ///
    /// Rejects with [`PipelineError::Busy`] while another conversion is in
    /// flight. A failed conversion leaves no partial state; the next call
    /// proceeds normally.
    pub fn convert(
        &self,
        image: &LoadedImage<R::Bitmap>,
        resize: &ResizeSpec,
        encode: &EncodeSpec,
    ) -> Result<Conversion, PipelineError> {
        if self.in_flight.swap(true, Ordering::Acquire) {
            return Err(PipelineError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let Dimensions { width, height } =
            compute_target_size(image.info.width, image.info.height, resize);

        // A background fill only matters when transparency is about to be
        // thrown away: lossy target, source format that can carry alpha.
        let background = if encode.format.is_lossy() && image.info.format.supports_transparency() {
            encode.background
        } else {
            None
        };

        let surface = self
            .rasterizer
            .render(&image.bitmap, width, height, background)
            .map_err(PipelineError::Encode)?;

        let output = match encode_adaptive(&self.rasterizer, &surface, width, height, encode) {
            Ok(output) => output,
            Err(RasterizerError::EncodeUnsupported(requested)) => {
                // Recoverable: encode PNG instead and say so.
                warn!(
                    "{} encode unavailable, falling back to PNG",
                    requested.mime_type()
                );
                let fallback = EncodeSpec {
                    format: ImageFormat::Png,
                    ..encode.clone()
                };
                encode_adaptive(&self.rasterizer, &surface, width, height, &fallback)
                    .map_err(PipelineError::Encode)?
            }
            Err(err) => return Err(PipelineError::Encode(err)),
        };

        let filename = derive_filename(&image.info.filename, width, height, output.format);

        Ok(Conversion {
            output,
            filename,
            requested_format: encode.format,
        })
    }
}
