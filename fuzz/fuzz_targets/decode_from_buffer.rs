#![no_main]

use libfuzzer_sys::fuzz_target;
use thumbnailer::{generate_thumbnail, ThumbnailOptions};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Keep the box small so a valid input does not dominate fuzz time.
    let opts = ThumbnailOptions::new(32, 32).with_source_limits(4096, 4096);
    if let Ok(result) = generate_thumbnail(data, &opts) {
        assert_eq!(result.byte_count, result.encoded_bytes.len());
        assert!(result.width >= 1 && result.height >= 1);
    }
});
