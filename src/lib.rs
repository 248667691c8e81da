//! # pixfit
//!
//! An in-process image resize and re-encode pipeline. Feed it a raw image
//! file, a resize mode, and an encode target; get back encoded bytes, a
//! suggested filename, and enough metadata to drive a UI — without the
//! image ever leaving the process.
//!
//! # Architecture: Sequential Pipeline over a Rasterizer
//!
//! One conversion is one straight-line pass:
//!
//! ```text
//! validate → decode → detect animation → compute dimensions → render → encode
//! ```
//!
//! The pixel work — decode, render, encode — lives behind the
//! [`Rasterizer`] trait. The pipeline composes pure calculations around it
//! and never touches a pixel buffer itself, so every decision it makes
//! (dimension math, size estimation, the adaptive quality search, format
//! fallback) unit-tests against a recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Format enum, MIME/extension resolution, lossy and transparency predicates |
//! | [`gif`] | Animated-GIF detection by raw byte scan — no decode needed |
//! | [`dimensions`] | Resize modes (custom, long-edge, preset) and the dimension math |
//! | [`estimate`] | Advisory output-size prediction for live previews |
//! | [`rasterizer`] | The [`Rasterizer`] trait, quality/background types, capability probing |
//! | [`adaptive`] | Quality-lowering encode search against a size budget |
//! | [`rust_rasterizer`] | Production rasterizer: `image` crate + avif-parse/rav1d |
//! | [`naming`] | Output filename derivation |
//! | [`pipeline`] | Validation, loading, conversion orchestration, PNG fallback |
//!
//! # Design Decisions
//!
//! ## Estimation Is Advisory, Encoding Is Authoritative
//!
//! [`estimate_output_size`] is a hand-tuned heuristic for previews; nothing
//! gates on it. The number that matters is what the adaptive encoder
//! actually produces, and that loop measures real encoder output on every
//! attempt.
//!
//! ## Explicit Capabilities, No Globals
//!
//! AVIF and WebP encode support varies with how the rasterizer was built,
//! so it is probed once — by real 1×1 trial encodes — into a
//! [`Capabilities`](rasterizer::Capabilities) value carried by the
//! pipeline. There is no process-global support flag to mutate or to go
//! stale.
//!
//! ## Format Fallback over Failure
//!
//! When the requested encode format is unavailable the pipeline encodes
//! PNG instead and reports the substitution on the result. Users get their
//! image plus a warning, not an error.
//!
//! ## Pure-Rust Imaging
//!
//! The production rasterizer is the `image` crate plus `rav1d` for AVIF
//! decode — no system codecs, no C toolchain, fully self-contained.
//!
//! # Example
//!
//! ```no_run
//! use pixfit::{
//!     ConversionPipeline, EncodeSpec, ImageFormat, ResizeSpec, RustRasterizer, SourceFile,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ConversionPipeline::new(RustRasterizer::new());
//! let file = SourceFile::from_path("holiday.jpg".as_ref())?;
//!
//! let image = pipeline.load(&file)?;
//! let conversion = pipeline.convert(
//!     &image,
//!     &ResizeSpec::LongEdge { edge: Some(1600) },
//!     &EncodeSpec {
//!         size_budget: Some(image.info.byte_length),
//!         ..EncodeSpec::new(ImageFormat::WebP)
//!     },
//! )?;
//!
//! std::fs::write(&conversion.filename, &conversion.output.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod adaptive;
pub mod dimensions;
pub mod estimate;
pub mod format;
pub mod gif;
pub mod naming;
pub mod pipeline;
pub mod rasterizer;
pub mod rust_rasterizer;

pub use adaptive::{EncodeSpec, EncodedResult, encode_adaptive};
pub use dimensions::{Axis, Dimensions, MAX_DIMENSION, ResizeSpec, compute_target_size};
pub use estimate::{EstimationResult, estimate_output_size};
pub use format::ImageFormat;
pub use gif::is_animated_gif;
pub use naming::derive_filename;
pub use pipeline::{
    Conversion, ConversionPipeline, LoadedImage, MAX_FILE_SIZE, PipelineError, SourceFile,
    SourceImage, ValidationError,
};
pub use rasterizer::{Background, Capabilities, Quality, Rasterizer, RasterizerError};
pub use rust_rasterizer::RustRasterizer;
