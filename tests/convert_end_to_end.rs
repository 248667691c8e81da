//! End-to-end conversions through the public API with the real rasterizer.
//!
//! These tests exercise the whole path — validate, decode, dimension math,
//! render, adaptive encode — on small synthetic images, and verify the
//! output by decoding it again.

use pixfit::{
    Background, ConversionPipeline, EncodeSpec, ImageFormat, Quality, Rasterizer, ResizeSpec,
    RustRasterizer, SourceFile,
};

/// Encode a synthetic RGBA gradient as PNG bytes via the rasterizer itself.
fn synthetic_png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 200, alpha])
    });
    RustRasterizer::new()
        .encode(&img, ImageFormat::Png, None)
        .unwrap()
}

#[test]
fn png_to_jpeg_long_edge() {
    let pipeline = ConversionPipeline::new(RustRasterizer::new());
    let file = SourceFile::new("gradient.png", synthetic_png(400, 200, 255));

    let image = pipeline.load(&file).unwrap();
    assert_eq!(image.info.format, ImageFormat::Png);
    assert_eq!(image.info.aspect_ratio, "2:1");

    let conversion = pipeline
        .convert(
            &image,
            &ResizeSpec::LongEdge { edge: Some(100) },
            &EncodeSpec::new(ImageFormat::Jpeg),
        )
        .unwrap();

    assert_eq!(conversion.filename, "gradient_100x50.jpeg");
    assert_eq!(conversion.output.format, ImageFormat::Jpeg);
    assert!(!conversion.format_substituted());

    // The output must decode to the computed dimensions.
    let decoded = RustRasterizer::new().decode(&conversion.output.bytes).unwrap();
    assert_eq!((decoded.width, decoded.height), (100, 50));
}

#[test]
fn transparent_png_to_jpeg_gets_background() {
    let pipeline = ConversionPipeline::new(RustRasterizer::new());
    let file = SourceFile::new("ghost.png", synthetic_png(32, 32, 0));

    let image = pipeline.load(&file).unwrap();
    let conversion = pipeline
        .convert(
            &image,
            &ResizeSpec::Custom {
                width: Some(32),
                height: Some(32),
                lock_ratio: false,
                primary: pixfit::Axis::Width,
            },
            &EncodeSpec {
                background: Some(Background { r: 255, g: 0, b: 0 }),
                ..EncodeSpec::new(ImageFormat::Jpeg)
            },
        )
        .unwrap();

    // Fully transparent source over a red fill: the JPEG should come back
    // clearly red (lossy, so only roughly).
    let raster = RustRasterizer::new();
    let decoded = raster.decode(&conversion.output.bytes).unwrap();
    let surface = raster.render(&decoded.bitmap, 32, 32, None).unwrap();
    let px = surface.get_pixel(16, 16);
    assert!(px.0[0] > 200, "expected red-dominant pixel, got {:?}", px.0);
    assert!(px.0[1] < 80);
}

#[test]
fn jpeg_to_png_is_single_attempt() {
    let pipeline = ConversionPipeline::new(RustRasterizer::new());
    let raster = RustRasterizer::new();

    let rgb = image::RgbaImage::from_pixel(64, 64, image::Rgba([10, 200, 30, 255]));
    let jpeg_bytes = raster
        .encode(&rgb, ImageFormat::Jpeg, Some(Quality::new(0.9)))
        .unwrap();
    let file = SourceFile::new("solid.jpg", jpeg_bytes);

    let image = pipeline.load(&file).unwrap();
    let conversion = pipeline
        .convert(
            &image,
            &ResizeSpec::LongEdge { edge: None },
            &EncodeSpec {
                // PNG ignores budgets entirely.
                size_budget: Some(1),
                ..EncodeSpec::new(ImageFormat::Png)
            },
        )
        .unwrap();

    assert_eq!(conversion.output.format, ImageFormat::Png);
    assert_eq!(conversion.output.achieved_quality, None);
    assert!(!conversion.output.quality_was_reduced);
}

#[test]
fn tight_budget_reduces_quality_on_real_encoder() {
    let pipeline = ConversionPipeline::new(RustRasterizer::new());
    // Noisy content compresses poorly, which is what the budget needs.
    let img = image::RgbaImage::from_fn(256, 256, |x, y| {
        let v = (x * 31 + y * 17) % 251;
        image::Rgba([v as u8, (v * 3 % 256) as u8, (v * 7 % 256) as u8, 255])
    });
    let png = RustRasterizer::new().encode(&img, ImageFormat::Png, None).unwrap();
    let file = SourceFile::new("noise.png", png);

    let image = pipeline.load(&file).unwrap();
    let conversion = pipeline
        .convert(
            &image,
            &ResizeSpec::LongEdge { edge: None },
            &EncodeSpec {
                quality: Quality::new(0.9),
                size_budget: Some(1), // impossible
                ..EncodeSpec::new(ImageFormat::Jpeg)
            },
        )
        .unwrap();

    assert!(conversion.output.quality_was_reduced);
    let achieved = conversion.output.achieved_quality.unwrap().value();
    assert!((achieved - 0.3).abs() < 1e-4, "expected floor quality, got {achieved}");
}

#[test]
fn estimate_matches_computed_dimensions() {
    let pipeline = ConversionPipeline::new(RustRasterizer::new());
    let file = SourceFile::new("gradient.png", synthetic_png(400, 200, 255));
    let image = pipeline.load(&file).unwrap();

    let dims = pixfit::compute_target_size(
        image.info.width,
        image.info.height,
        &ResizeSpec::LongEdge { edge: Some(200) },
    );
    let estimate = pixfit::estimate_output_size(
        dims.width,
        dims.height,
        ImageFormat::WebP,
        0.85,
        Some(&image.info),
    );

    assert_eq!((estimate.width, estimate.height), (200, 100));
    assert_eq!(estimate.raw_size_bytes, 200 * 100 * 4);
    assert!(estimate.estimated_bytes >= 1024);
}
