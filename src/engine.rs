// src/engine.rs
//
// The thumbnail engine. Per request:
// 1. Decode the source (routed by format, guarded by hard limits)
// 2. Plan the target geometry (configured limits, pass-through, scale)
// 3. Coarse-sample to 4x the target, box-filter to the target, encode
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod backend;
mod common;
mod decoder;
mod encoder;
mod firewall;
mod io;
mod pipeline;
mod planner;
mod pool;
mod tasks;

pub use api::{generate_thumbnail, Thumbnailer};
pub use backend::{NativeBackend, ThumbnailBackend};
pub use common::{run_with_panic_policy, EngineResult};
pub use decoder::{
    check_dimensions, decode_image, detect_format, sniff_page_description, DecodedImage,
    FormatCapabilities, SourceFormat,
};
pub use encoder::{encode_jpeg, encode_png_fast, encode_thumbnail};
pub use firewall::SourceLimits;
pub use io::Source;
pub use pipeline::{box_resize, coarse_sample, ResampleError, ResampleStage};
pub use planner::{plan, ThumbnailPlan, INTERMEDIATE_FACTOR};
pub use tasks::{TaskStage, ThumbnailResult, ThumbnailTask};
