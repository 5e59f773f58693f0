#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use thumbnailer::engine::{plan, SourceFormat, INTERMEDIATE_FACTOR};
use thumbnailer::{ThumbnailError, ThumbnailOptions};

#[derive(Arbitrary, Debug)]
struct Input {
    max_width: u32,
    max_height: u32,
    target_width: u32,
    target_height: u32,
    width: u32,
    height: u32,
    page_description: bool,
}

fuzz_target!(|data: Input| {
    let opts = ThumbnailOptions::new(data.target_width.max(1), data.target_height.max(1))
        .with_source_limits(data.max_width, data.max_height);
    let format = if data.page_description {
        SourceFormat::pdf()
    } else {
        SourceFormat::raster("png")
    };

    match plan(data.width, data.height, &format, &opts) {
        Ok(p) => {
            assert!(p.target_width >= 1 && p.target_height >= 1);
            if p.pass_through {
                assert_eq!(p.target_dims(), (data.width, data.height));
            }
        }
        Err(ThumbnailError::SourceTooWide { width, max }) => {
            assert!(!data.page_description);
            assert!(max != 0 && width > max);
        }
        Err(ThumbnailError::SourceTooTall { height, max }) => {
            assert!(!data.page_description);
            assert!(max != 0 && height > max);
        }
        Err(ThumbnailError::SampleFailed { target_width, target_height, .. }) => {
            assert!(
                target_width.checked_mul(INTERMEDIATE_FACTOR).is_none()
                    || target_height.checked_mul(INTERMEDIATE_FACTOR).is_none()
            );
        }
        Err(other) => panic!("unexpected planner error: {other:?}"),
    }
});
