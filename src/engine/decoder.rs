// src/engine/decoder.rs
//
// Decoder adapter: format detection and routed decoders
// (JPEG via mozjpeg, PNG via zune-png, WebP via libwebp, rest via image).

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::error::ThumbnailError;
use bitflags::bitflags;
use image::{
    DynamicImage, GenericImageView, GrayAlphaImage, GrayImage, ImageFormat, ImageReader,
    RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};

bitflags! {
    /// What a source format is, beyond "a grid of pixels".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatCapabilities: u8 {
        /// Page-description language (PDF, PostScript), rasterized when read
        const PAGE_DESCRIPTION = 0b0000_0001;
        /// Resolution-independent vector data
        const VECTOR = 0b0000_0010;
    }
}

/// Tag describing where a decoded image came from.
///
/// Open-ended: a custom backend can introduce its own format names and
/// capabilities without touching the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFormat {
    name: Cow<'static, str>,
    capabilities: FormatCapabilities,
}

impl SourceFormat {
    pub fn new(name: impl Into<Cow<'static, str>>, capabilities: FormatCapabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
        }
    }

    /// Plain bitmap format
    pub fn raster(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, FormatCapabilities::empty())
    }

    pub fn page_description(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(
            name,
            FormatCapabilities::PAGE_DESCRIPTION | FormatCapabilities::VECTOR,
        )
    }

    pub fn pdf() -> Self {
        Self::page_description("pdf")
    }

    pub fn postscript() -> Self {
        Self::page_description("ps")
    }

    pub fn unknown() -> Self {
        Self::raster("unknown")
    }

    pub fn from_image_format(format: ImageFormat) -> Self {
        Self::raster(format!("{:?}", format).to_lowercase())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> FormatCapabilities {
        self.capabilities
    }

    /// True when pixel dimensions are chosen at read time rather than stored
    /// in the file, so configured bitmap limits do not apply.
    pub fn is_rasterized_at_decode(&self) -> bool {
        self.capabilities
            .intersects(FormatCapabilities::PAGE_DESCRIPTION | FormatCapabilities::VECTOR)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decoded pixels plus the format they were read from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    format: SourceFormat,
}

impl DecodedImage {
    pub fn new(image: DynamicImage, format: SourceFormat) -> Self {
        Self { image, format }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn format(&self) -> &SourceFormat {
        &self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Hand the pixels over to the next stage.
    pub fn into_parts(self) -> (DynamicImage, SourceFormat) {
        (self.image, self.format)
    }
}

/// True when the stream's last marker is EOI (`FF D9`), ignoring trailing
/// zero padding. An EOI from an embedded EXIF thumbnail does not count.
fn ends_with_eoi(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|&b| b != 0x00)
        .map_or(0, |last| last + 1);
    data[..end].ends_with(&[0xFF, 0xD9])
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        // libjpeg pads a truncated stream with grey instead of failing
        if !ends_with_eoi(data) {
            return Err(ThumbnailError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            ThumbnailError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            ThumbnailError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(ThumbnailError::dimension_exceeds_limit(
                width.max(height).min(u32::MAX as usize) as u32,
                MAX_DIMENSION,
            ));
        }
        let width_u32 = width as u32;
        let height_u32 = height as u32;
        check_dimensions(width_u32, height_u32)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ThumbnailError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image =
            RgbImage::from_raw(width_u32, height_u32, flat_pixels).ok_or_else(|| {
                ThumbnailError::decode_failed("mozjpeg: scanline data shorter than header size")
            })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode formats without a dedicated decoder through the image crate.
pub fn decode_with_image_crate(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data).map_err(|e| match e {
            image::ImageError::Unsupported(u) => ThumbnailError::unsupported_format(u.to_string()),
            other => ThumbnailError::decode_failed(format!("decode failed: {other}")),
        })
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| ThumbnailError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| ThumbnailError::decode_failed("png: missing header info"))?;
        let width = info.width as u32;
        let height = info.height as u32;
        check_dimensions(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ThumbnailError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ThumbnailError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
            ColorSpace::RGBA => {
                RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
            }
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8),
            ColorSpace::LumaA => {
                GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
            }
            other => {
                return Err(ThumbnailError::decode_failed(format!(
                    "png: unsupported colorspace {:?}",
                    other
                )))
            }
        };

        img.ok_or_else(|| {
            ThumbnailError::decode_failed(format!(
                "png: pixel buffer does not match {colorspace:?} {width}x{height}"
            ))
        })
    })
}

/// Decode WebP using libwebp. Animated WebP goes through the image crate,
/// which yields the first frame.
pub fn decode_webp_libwebp(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        let features = BitstreamFeatures::new(data).ok_or_else(|| {
            ThumbnailError::decode_failed("webp: failed to read bitstream features")
        })?;

        if features.has_animation() {
            tracing::trace!(target: "thumbnailer::decoder", "animated webp, using first frame");
            return image::load_from_memory(data).map_err(|e| {
                ThumbnailError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| ThumbnailError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Recognize page-description inputs by their leading signature.
pub fn sniff_page_description(bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.starts_with(b"%PDF-") {
        Some(SourceFormat::pdf())
    } else if bytes.starts_with(b"%!PS") {
        Some(SourceFormat::postscript())
    } else {
        None
    }
}

/// Unified decode entrypoint:
/// - Reject page-description input (no rasterizer is compiled in)
/// - Check header dimensions against the hard limits before allocating
/// - Route JPEG to mozjpeg, PNG to zune-png, WebP to libwebp, others to image
pub fn decode_image(bytes: &[u8]) -> EngineResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(ThumbnailError::decode_failed("empty input"));
    }

    if let Some(format) = sniff_page_description(bytes) {
        tracing::trace!(target: "thumbnailer::decoder", format = %format, "page description input");
        return Err(ThumbnailError::unsupported_format(format.name().to_string()));
    }

    let detected = detect_format(bytes);
    ensure_dimensions_safe(bytes)?;

    tracing::trace!(target: "thumbnailer::decoder", format = ?detected, len = bytes.len(), "routing decode");
    let image = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::Png) => decode_png_zune(bytes)?,
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes)?,
        Some(_) => decode_with_image_crate(bytes)?,
        None => return Err(ThumbnailError::unsupported_format("unknown")),
    };

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ThumbnailError::corrupted_image());
    }

    let format = detected
        .map(SourceFormat::from_image_format)
        .unwrap_or_else(SourceFormat::unknown);
    Ok(DecodedImage::new(image, format))
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ThumbnailError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(ThumbnailError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}
