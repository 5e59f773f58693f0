#![no_main]

use libfuzzer_sys::fuzz_target;
use thumbnailer::inspect_header_from_bytes;

fuzz_target!(|data: &[u8]| {
    if let Ok(meta) = inspect_header_from_bytes(data) {
        // Header-only path must agree with the decoder's hard limits check.
        let _ = thumbnailer::engine::check_dimensions(meta.width, meta.height);
    }
});
