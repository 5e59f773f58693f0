// src/engine/pipeline.rs
//
// Two-stage downsampling: a nearest-neighbour coarse sample to the
// intermediate size, then a single box-filter pass to the exact target.

use crate::engine::common::EngineResult;
use crate::engine::MAX_PIXELS;
use crate::error::ThumbnailError;
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::fmt;
use tracing::debug;

/// Which resampling pass a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResampleStage {
    /// Nearest-neighbour sample to the intermediate grid
    Sample,
    /// Box-filter resize to the final target
    Resize,
}

impl ResampleStage {
    fn options(self) -> ResizeOptions {
        match self {
            Self::Sample => ResizeOptions::new().resize_alg(fir::ResizeAlg::Nearest),
            Self::Resize => ResizeOptions::new()
                .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Box)),
        }
    }

    /// Nearest sampling never blends neighbours, so alpha needs no premultiply.
    fn blends_pixels(self) -> bool {
        matches!(self, Self::Resize)
    }
}

impl fmt::Display for ResampleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample => f.write_str("sample"),
            Self::Resize => f.write_str("resize"),
        }
    }
}

#[derive(Debug)]
pub struct ResampleError {
    pub stage: ResampleStage,
    pub source_dims: (u32, u32),
    pub target_dims: (u32, u32),
    pub reason: String,
}

impl ResampleError {
    pub fn new(
        stage: ResampleStage,
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            source_dims,
            target_dims,
            reason: reason.into(),
        }
    }

    pub fn into_thumbnail_error(self) -> ThumbnailError {
        match self.stage {
            ResampleStage::Sample => {
                ThumbnailError::sample_failed(self.source_dims, self.target_dims, self.reason)
            }
            ResampleStage::Resize => {
                ThumbnailError::resize_failed(self.source_dims, self.target_dims, self.reason)
            }
        }
    }
}

/// Coarse nearest-neighbour sample. Consumes the source.
pub fn coarse_sample(img: DynamicImage, dst_width: u32, dst_height: u32) -> EngineResult<DynamicImage> {
    resample_owned(img, dst_width, dst_height, ResampleStage::Sample)
        .map_err(ResampleError::into_thumbnail_error)
}

/// Single-pass box-filter resize to the final size. Consumes the source.
pub fn box_resize(img: DynamicImage, dst_width: u32, dst_height: u32) -> EngineResult<DynamicImage> {
    resample_owned(img, dst_width, dst_height, ResampleStage::Resize)
        .map_err(ResampleError::into_thumbnail_error)
}

fn resample_owned(
    img: DynamicImage,
    dst_width: u32,
    dst_height: u32,
    stage: ResampleStage,
) -> std::result::Result<DynamicImage, ResampleError> {
    let src_width = img.width();
    let src_height = img.height();
    let fail = |reason: String| {
        ResampleError::new(stage, (src_width, src_height), (dst_width, dst_height), reason)
    };

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(fail(format!("invalid dimensions for {stage}")));
    }
    let dst_pixels = dst_width as u64 * dst_height as u64;
    if dst_pixels > MAX_PIXELS {
        return Err(fail(format!(
            "{stage} output of {dst_pixels} pixels exceeds limit of {MAX_PIXELS}"
        )));
    }

    debug!(
        target: "thumbnailer::pipeline",
        %stage,
        src_width,
        src_height,
        dst_width,
        dst_height,
        "resampling"
    );

    // Take the pixel buffer by value for 8-bit layouts; everything else is
    // converted once.
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        DynamicImage::ImageLuma8(luma) => (PixelType::U8, luma.into_raw()),
        other if other.color().has_alpha() => (PixelType::U8x4, other.to_rgba8().into_raw()),
        other => (PixelType::U8x3, other.to_rgb8().into_raw()),
    };

    resample_pixels(
        src_width, src_height, src_pixels, pixel_type, dst_width, dst_height, stage,
    )
    .map_err(fail)
}

/// Decide whether alpha premultiplication is required for a given pixel layout.
#[inline]
fn requires_premultiply(pixel_type: PixelType, stage: ResampleStage) -> bool {
    stage.blends_pixels() && matches!(pixel_type, PixelType::U8x4)
}

fn resample_pixels(
    src_width: u32,
    src_height: u32,
    mut src_pixels: Vec<u8>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
    stage: ResampleStage,
) -> std::result::Result<DynamicImage, String> {
    let pixel_count = (src_width as usize)
        .checked_mul(src_height as usize)
        .ok_or_else(|| "image dimensions overflow during resample".to_string())?;
    let required_bytes = pixel_count
        .checked_mul(pixel_type.size())
        .ok_or_else(|| "image buffer size overflow during resample".to_string())?;

    if src_pixels.len() < required_bytes {
        return Err(format!(
            "source buffer too small. expected {required_bytes} bytes, got {} bytes",
            src_pixels.len()
        ));
    }

    let resampled = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        pixel_type,
    ) {
        Ok(src_image) => resample_with_fir(src_image, pixel_type, dst_width, dst_height, stage),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            let aligned_image = copy_pixels_to_aligned_image(
                src_width,
                src_height,
                pixel_type,
                &src_pixels,
                required_bytes,
            )?;
            resample_with_fir(aligned_image, pixel_type, dst_width, dst_height, stage)
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };
    resampled
}

fn copy_pixels_to_aligned_image(
    width: u32,
    height: u32,
    pixel_type: PixelType,
    src_pixels: &[u8],
    required_bytes: usize,
) -> std::result::Result<fir::images::Image<'static>, String> {
    let mut aligned_image = fir::images::Image::new(width, height, pixel_type);
    let aligned_buffer = aligned_image.buffer_mut();
    if aligned_buffer.len() != required_bytes {
        return Err(format!(
            "aligned copy buffer mismatch. expected {required_bytes} bytes, got {} bytes",
            aligned_buffer.len()
        ));
    }
    aligned_buffer.copy_from_slice(&src_pixels[..required_bytes]);
    Ok(aligned_image)
}

/// Check if an RGBA image is fully opaque (all alpha values are 255)
///
/// Only scans images of at least 1MP; below that premultiply is cheaper
/// than the scan.
fn is_fully_opaque(image: &fir::images::Image, width: u32, height: u32) -> bool {
    const THRESHOLD_PIXELS: u64 = 1_000_000;
    if (width as u64).saturating_mul(height as u64) < THRESHOLD_PIXELS {
        return false;
    }
    image.buffer().iter().skip(3).step_by(4).all(|&alpha| alpha == 255)
}

fn resample_with_fir(
    mut src_image: fir::images::Image<'_>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
    stage: ResampleStage,
) -> std::result::Result<DynamicImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let src_width = src_image.width();
    let src_height = src_image.height();
    let needs_premultiply = requires_premultiply(pixel_type, stage)
        && !is_fully_opaque(&src_image, src_width, src_height);

    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &stage.options())
        .map_err(|e| format!("fir {stage} error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8 => GrayImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| "failed to create luma image from resampled data".to_string()),
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to create rgb image from resampled data".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to create rgba image from resampled data".to_string()),
        _ => Err("unsupported pixel type after resample".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, LumaA, Rgb, Rgba};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn test_coarse_sample_hits_exact_size() {
        let out = coarse_sample(create_test_image(4000, 2000), 800, 400).unwrap();
        assert_eq!(out.dimensions(), (800, 400));
    }

    #[test]
    fn test_coarse_sample_picks_existing_pixels() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, _| {
            if x % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }));
        let out = coarse_sample(src, 4, 4).unwrap().to_rgb8();
        for p in out.pixels() {
            assert!(p.0 == [0, 0, 0] || p.0 == [255, 255, 255]);
        }
    }

    #[test]
    fn test_box_resize_averages() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([200, 200, 200])
            }
        }));
        let out = box_resize(src, 1, 1).unwrap().to_rgb8();
        let v = out.get_pixel(0, 0).0[0];
        assert!((95..=105).contains(&v), "got {v}");
    }

    #[test]
    fn test_box_resize_does_not_blend_across_cells() {
        // 4 -> 2 box cells are {0, 1} and {2, 3}; a wider kernel would bleed
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 1, |x, _| {
            if x < 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([200, 200, 200])
            }
        }));
        let out = box_resize(src, 2, 1).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_rgba_resize_error_is_reported_for_its_stage() {
        let err = resample_owned(
            DynamicImage::ImageRgba8(RgbaImage::new(4, 4)),
            2,
            0,
            ResampleStage::Resize,
        )
        .unwrap_err();
        assert_eq!(err.stage, ResampleStage::Resize);
        assert!(matches!(err.into_thumbnail_error(), ThumbnailError::ResizeFailed { .. }));
    }

    #[test]
    fn test_box_resize_can_upsample() {
        let out = box_resize(create_test_image(10, 5), 40, 20).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn test_rgba_is_preserved() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 0])));
        let out = box_resize(src, 4, 4).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_luma_alpha_converts_to_rgba() {
        let src = DynamicImage::ImageLumaA8(image::ImageBuffer::from_pixel(8, 8, LumaA([50, 255])));
        let out = coarse_sample(src, 2, 2).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_zero_target_reports_stage() {
        let err = coarse_sample(create_test_image(4, 4), 0, 2).unwrap_err();
        assert!(matches!(err, ThumbnailError::SampleFailed { target_width: 0, .. }));

        let err = box_resize(create_test_image(4, 4), 2, 0).unwrap_err();
        assert!(matches!(err, ThumbnailError::ResizeFailed { target_height: 0, .. }));
    }

    #[test]
    fn test_oversized_output_is_rejected_without_allocating() {
        let err = coarse_sample(create_test_image(4, 4), 80_000, 40_000).unwrap_err();
        assert!(matches!(
            err,
            ThumbnailError::SampleFailed { target_width: 80_000, target_height: 40_000, .. }
        ));

        let err = box_resize(create_test_image(4, 4), u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(err, ThumbnailError::ResizeFailed { .. }));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let err = resample_pixels(4, 4, vec![0; 10], PixelType::U8x3, 2, 2, ResampleStage::Resize)
            .unwrap_err();
        assert!(err.contains("too small"));
    }
}
