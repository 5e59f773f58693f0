// tests/edge_cases.rs
//
// Edge case tests for thumbnailer
// Tests boundary values, invalid inputs, and error handling

use image::{DynamicImage, GenericImageView, RgbImage};
use std::io::Write;
use thumbnailer::engine::{
    box_resize, check_dimensions, coarse_sample, plan, SourceFormat, MAX_DIMENSION,
};
use thumbnailer::{generate_thumbnail, ThumbnailError, ThumbnailOptions, Thumbnailer};

// Helper function to create test images
fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

// Helper to create valid JPEG of specified size
fn create_valid_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = create_test_image(width, height);
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let pixels = rgb.into_raw();

    use mozjpeg::ColorSpace;
    use mozjpeg::Compress;

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(w as usize, h as usize);
    comp.set_quality(80.0);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));

    let mut output = Vec::new();
    {
        let mut writer = comp.start_compress(&mut output).unwrap();
        let stride = w as usize * 3;
        for row in pixels.chunks(stride) {
            writer.write_scanlines(row).unwrap();
        }
        writer.finish().unwrap();
    }
    output
}

fn create_valid_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    create_test_image(width, height)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

mod boundary_dimensions {
    use super::*;

    #[test]
    fn test_one_by_one_passes_through() {
        let result = generate_thumbnail(&create_valid_png(1, 1), &ThumbnailOptions::new(1, 1)).unwrap();
        assert_eq!((result.width, result.height), (1, 1));
    }

    #[test]
    fn test_one_pixel_box() {
        let result =
            generate_thumbnail(&create_valid_jpeg(64, 48), &ThumbnailOptions::new(1, 1)).unwrap();
        assert_eq!((result.width, result.height), (1, 1));
    }

    #[test]
    fn test_extreme_wide_aspect_clamps_height() {
        let result =
            generate_thumbnail(&create_valid_png(2000, 1), &ThumbnailOptions::new(100, 100)).unwrap();
        assert_eq!((result.width, result.height), (100, 1));
    }

    #[test]
    fn test_extreme_tall_aspect_clamps_width() {
        let result =
            generate_thumbnail(&create_valid_png(1, 2000), &ThumbnailOptions::new(100, 100)).unwrap();
        assert_eq!((result.width, result.height), (1, 100));
    }

    #[test]
    fn test_source_smaller_than_intermediate() {
        // 120x60 into a 100 box samples up to 400x200 before the box pass.
        let result =
            generate_thumbnail(&create_valid_png(120, 60), &ThumbnailOptions::new(100, 100)).unwrap();
        assert_eq!((result.width, result.height), (100, 50));
    }

    #[test]
    fn test_non_dominant_axis_may_exceed_box() {
        let opts = ThumbnailOptions::new(200, 100);
        let p = plan(400, 300, &SourceFormat::raster("png"), &opts).unwrap();
        assert_eq!(p.target_dims(), (200, 150));
    }

    #[test]
    fn test_hard_dimension_limit() {
        assert!(check_dimensions(MAX_DIMENSION, 1).is_ok());
        assert!(check_dimensions(MAX_DIMENSION + 1, 1).is_err());
    }
}

mod invalid_input {
    use super::*;

    #[test]
    fn test_empty_input() {
        let err = generate_thumbnail(&[], &ThumbnailOptions::default()).unwrap_err();
        assert!(matches!(err, ThumbnailError::DecodeFailed { .. }));
    }

    #[test]
    fn test_truncated_png() {
        let png = create_valid_png(64, 64);
        let err = generate_thumbnail(&png[..png.len() / 2], &ThumbnailOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_jpeg_missing_eoi() {
        let jpeg = create_valid_jpeg(32, 32);
        let err = generate_thumbnail(&jpeg[..jpeg.len() - 2], &ThumbnailOptions::default());
        assert!(matches!(err, Err(ThumbnailError::DecodeFailed { .. })));
    }

    #[test]
    fn test_zero_target_is_invalid_argument() {
        let err = generate_thumbnail(&create_valid_png(4, 4), &ThumbnailOptions::new(0, 0)).unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_quality_out_of_range() {
        let opts = ThumbnailOptions::new(10, 10).with_lossy(101);
        let err = generate_thumbnail(&create_valid_png(4, 4), &opts).unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument { .. }));
    }

    #[test]
    fn test_resample_rejects_zero_dimensions() {
        assert!(matches!(
            coarse_sample(create_test_image(4, 4), 0, 4),
            Err(ThumbnailError::SampleFailed { .. })
        ));
        assert!(matches!(
            box_resize(create_test_image(4, 4), 4, 0),
            Err(ThumbnailError::ResizeFailed { .. })
        ));
    }
}

mod file_sources {
    use super::*;

    #[test]
    fn test_generate_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&create_valid_jpeg(320, 240)).unwrap();

        let thumbnailer = Thumbnailer::new(ThumbnailOptions::new(80, 80).with_lossy(75));
        let result = thumbnailer.generate_file(file.path()).unwrap();
        assert_eq!((result.width, result.height), (80, 60));
        let decoded = image::load_from_memory(&result.encoded_bytes).unwrap();
        assert_eq!(decoded.dimensions(), (80, 60));
    }

    #[test]
    fn test_generate_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = Thumbnailer::default().generate_file(file.path()).unwrap_err();
        assert!(matches!(err, ThumbnailError::DecodeFailed { .. }));
    }

    #[test]
    fn test_generate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Thumbnailer::default()
            .generate_file(dir.path().join("missing.jpg"))
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::FileNotFound { .. }));
    }
}
