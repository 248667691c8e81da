//! Pure Rust rasterizer — zero system dependencies.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF first frame) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + custom YUV→RGBA |
//! | Render | `image::imageops::resize` with `Lanczos3`, `overlay` for background fill |
//! | Encode → JPEG / PNG | `image` codecs |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless only — quality is accepted and ignored) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! Everything operates on in-memory byte slices; the rasterizer never
//! touches the filesystem.

use crate::format::ImageFormat;
use crate::rasterizer::{Background, Decoded, Quality, Rasterizer, RasterizerError};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

/// Pure Rust rasterizer using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustRasterizer;

impl RustRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// ISO-BMFF sniff: box size, then `ftyp`, then an AVIF brand. The `image`
/// crate's format guesser has no AVIF decoder behind it, so AVIF is routed
/// to our own decode path before the guesser ever sees it.
fn looks_like_avif(bytes: &[u8]) -> bool {
    bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && (&bytes[8..12] == b"avif" || &bytes[8..12] == b"avis" || &bytes[8..12] == b"mif1")
}

impl Rasterizer for RustRasterizer {
    type Bitmap = DynamicImage;
    type Surface = RgbaImage;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<DynamicImage>, RasterizerError> {
        let img = if looks_like_avif(bytes) {
            decode_avif(bytes)?
        } else {
            ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()
                .map_err(|e| RasterizerError::DecodeFailed(e.to_string()))?
                .decode()
                .map_err(|e| RasterizerError::DecodeFailed(e.to_string()))?
        };
        Ok(Decoded {
            width: img.width(),
            height: img.height(),
            bitmap: img,
        })
    }

    fn render(
        &self,
        bitmap: &DynamicImage,
        width: u32,
        height: u32,
        background: Option<Background>,
    ) -> Result<RgbaImage, RasterizerError> {
        if width == 0 || height == 0 {
            return Err(RasterizerError::EncodeFailed(format!(
                "cannot render a {width}x{height} surface"
            )));
        }
        let resized = bitmap.resize_exact(width, height, FilterType::Lanczos3).into_rgba8();

        match background {
            Some(bg) => {
                let mut canvas =
                    RgbaImage::from_pixel(width, height, Rgba([bg.r, bg.g, bg.b, 255]));
                image::imageops::overlay(&mut canvas, &resized, 0, 0);
                Ok(canvas)
            }
            None => Ok(resized),
        }
    }

    fn encode(
        &self,
        surface: &RgbaImage,
        format: ImageFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, RasterizerError> {
        let mut out = Vec::new();
        let (width, height) = surface.dimensions();
        let quality_percent = encoder_quality(quality);

        match format {
            ImageFormat::Jpeg => {
                // JPEG carries no alpha; any fill was composited at render
                // time, remaining alpha is simply dropped.
                let rgb = DynamicImage::ImageRgba8(surface.clone()).into_rgb8();
                image::codecs::jpeg::JpegEncoder::new_with_quality(
                    Cursor::new(&mut out),
                    quality_percent,
                )
                .write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| RasterizerError::EncodeFailed(e.to_string()))?;
            }
            ImageFormat::Png => {
                image::codecs::png::PngEncoder::new(Cursor::new(&mut out))
                    .write_image(
                        surface.as_raw(),
                        width,
                        height,
                        image::ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| RasterizerError::EncodeFailed(e.to_string()))?;
            }
            ImageFormat::WebP => {
                image::codecs::webp::WebPEncoder::new_lossless(Cursor::new(&mut out))
                    .write_image(
                        surface.as_raw(),
                        width,
                        height,
                        image::ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| RasterizerError::EncodeFailed(e.to_string()))?;
            }
            ImageFormat::Avif => {
                image::codecs::avif::AvifEncoder::new_with_speed_quality(
                    Cursor::new(&mut out),
                    6,
                    quality_percent,
                )
                .write_image(
                    surface.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| RasterizerError::EncodeFailed(e.to_string()))?;
            }
            ImageFormat::Gif => return Err(RasterizerError::EncodeUnsupported(format)),
        }

        Ok(out)
    }

    fn supports_encode(&self, format: ImageFormat) -> bool {
        !matches!(format, ImageFormat::Gif)
    }
}

/// Map `[0,1]` quality onto the `1..=100` scale the `image` encoders take.
fn encoder_quality(quality: Option<Quality>) -> u8 {
    let q = quality.unwrap_or_default().value();
    ((q * 100.0).round() as u8).clamp(1, 100)
}

/// Decode an AVIF byte stream using avif-parse (container) + rav1d.
///
/// The `image` crate's `"avif"` feature only provides the encoder (rav1e);
/// its decoder needs `"avif-native"`, a C dependency. `rav1d` is the pure
/// Rust port of dav1d, so decoding stays self-contained. Alpha auxiliary
/// items are not decoded; output is fully opaque RGBA.
fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, RasterizerError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use std::ptr::NonNull;

    let avif = avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| RasterizerError::DecodeFailed(format!("AVIF container: {e:?}")))?;
    let av1_bytes: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe {
        rav1d::src::lib::dav1d_default_settings(NonNull::new(settings.as_mut_ptr()).unwrap())
    };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(RasterizerError::DecodeFailed(format!("rav1d open ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(RasterizerError::DecodeFailed("rav1d data_create".to_string()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(RasterizerError::DecodeFailed(format!("rav1d send_data ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(RasterizerError::DecodeFailed(format!("rav1d get_picture ({})", rc.0)));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;
    let y_stride = pic.stride[0];
    let uv_stride = pic.stride[1];
    let y_ptr = pic.data[0].unwrap().as_ptr() as *const u8;

    let rgba = if layout == DAV1D_PIXEL_LAYOUT_I400 {
        YuvView {
            y_ptr,
            u_ptr: y_ptr,
            v_ptr: y_ptr,
            y_stride,
            uv_stride: 0,
            width,
            height,
            bpc,
            subsample_x: false,
            subsample_y: false,
            monochrome: true,
        }
        .into_rgba()
    } else {
        let u_ptr = pic.data[1].unwrap().as_ptr() as *const u8;
        let v_ptr = pic.data[2].unwrap().as_ptr() as *const u8;
        let (subsample_x, subsample_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            _ => {
                unsafe {
                    rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
                    rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
                }
                return Err(RasterizerError::DecodeFailed(format!(
                    "unsupported AVIF pixel layout: {layout}"
                )));
            }
        };
        YuvView {
            y_ptr,
            u_ptr,
            v_ptr,
            y_stride,
            uv_stride,
            width,
            height,
            bpc,
            subsample_x,
            subsample_y,
            monochrome: false,
        }
        .into_rgba()
    };

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }

    RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| RasterizerError::DecodeFailed("AVIF plane conversion".to_string()))
}

/// Borrowed view over rav1d's decoded YUV planes.
struct YuvView {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal / vertical (I420 = both).
    subsample_x: bool,
    subsample_y: bool,
    monochrome: bool,
}

impl YuvView {
    /// Convert to interleaved opaque RGBA8 using BT.601 coefficients,
    /// scaling 10/12-bit samples down to 8.
    fn into_rgba(self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgba = vec![255u8; (self.width * self.height * 4) as usize];

        for row in 0..self.height {
            for col in 0..self.width {
                let y_val = read_sample(self.y_ptr, self.y_stride, col, row, self.bpc);

                let (r, g, b) = if self.monochrome {
                    let v = (y_val * scale).clamp(0.0, 255.0);
                    (v, v, v)
                } else {
                    let u_col = if self.subsample_x { col / 2 } else { col };
                    let u_row = if self.subsample_y { row / 2 } else { row };
                    let cb =
                        read_sample(self.u_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;
                    let cr =
                        read_sample(self.v_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;

                    (
                        ((y_val + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                };

                let idx = ((row * self.width + col) * 4) as usize;
                rgba[idx] = r as u8;
                rgba[idx + 1] = g as u8;
                rgba[idx + 2] = b as u8;
            }
        }

        rgba
    }
}

/// Read one plane sample; 10/12-bit planes store u16 values.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { *(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}
