// src/engine/backend.rs
//
// The collaborator seam: decoding, the two resampling passes and encoding
// sit behind `ThumbnailBackend`, so the planning and stage ordering in
// `tasks.rs` run unchanged against the native codecs or a test double.

use crate::engine::common::EngineResult;
use crate::engine::decoder::{self, DecodedImage};
use crate::engine::{encoder, pipeline};
use crate::ops::OutputFormat;
use image::DynamicImage;

/// Codec and resampler primitives used by a thumbnail request.
///
/// Resampling methods take the image by value; the input buffer is released
/// once the output exists.
pub trait ThumbnailBackend: Sync {
    /// Decode raw bytes into pixels and a format tag.
    fn decode(&self, bytes: &[u8]) -> EngineResult<DecodedImage>;

    /// Fast nearest-neighbour sample to the intermediate size.
    fn sample(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage>;

    /// Single box-filter pass to the final size.
    fn resize(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage>;

    /// Serialize the final pixels.
    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> EngineResult<Vec<u8>>;
}

/// Production backend: mozjpeg/zune-png/libwebp/image decoders,
/// fast_image_resize resampling, mozjpeg/image encoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl ThumbnailBackend for NativeBackend {
    fn decode(&self, bytes: &[u8]) -> EngineResult<DecodedImage> {
        decoder::decode_image(bytes)
    }

    fn sample(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
        pipeline::coarse_sample(image, width, height)
    }

    fn resize(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
        pipeline::box_resize(image, width, height)
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> EngineResult<Vec<u8>> {
        encoder::encode_thumbnail(image, format)
    }
}

impl<B: ThumbnailBackend + ?Sized> ThumbnailBackend for &B {
    fn decode(&self, bytes: &[u8]) -> EngineResult<DecodedImage> {
        (**self).decode(bytes)
    }

    fn sample(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
        (**self).sample(image, width, height)
    }

    fn resize(&self, image: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
        (**self).resize(image, width, height)
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> EngineResult<Vec<u8>> {
        (**self).encode(image, format)
    }
}
