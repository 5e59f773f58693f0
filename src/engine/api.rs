// src/engine/api.rs
//
// Public entry points: single buffer, file, source and batch generation.

use crate::engine::backend::{NativeBackend, ThumbnailBackend};
use crate::engine::io::Source;
use crate::engine::pool;
use crate::engine::tasks::{ThumbnailResult, ThumbnailTask};
use crate::error::Result;
use crate::ops::ThumbnailOptions;
use crate::ProcessingMetrics;
use rayon::prelude::*;
use std::path::Path;

/// Generate a thumbnail from encoded bytes with the native codecs.
pub fn generate_thumbnail(bytes: &[u8], options: &ThumbnailOptions) -> Result<ThumbnailResult> {
    ThumbnailTask::new(&NativeBackend, options).run(bytes, None)
}

/// Reusable generator bound to one configuration and one backend.
#[derive(Debug, Clone)]
pub struct Thumbnailer<B: ThumbnailBackend = NativeBackend> {
    backend: B,
    options: ThumbnailOptions,
}

impl Thumbnailer<NativeBackend> {
    pub fn new(options: ThumbnailOptions) -> Self {
        Self::with_backend(NativeBackend, options)
    }

    /// Generator configured from a named preset (`standard`, `large`).
    pub fn from_preset(name: &str) -> Result<Self> {
        ThumbnailOptions::preset(name).map(Self::new)
    }
}

impl Default for Thumbnailer<NativeBackend> {
    fn default() -> Self {
        Self::new(ThumbnailOptions::default())
    }
}

impl<B: ThumbnailBackend> Thumbnailer<B> {
    pub fn with_backend(backend: B, options: ThumbnailOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &ThumbnailOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[tracing::instrument(
        target = "thumbnailer::task",
        level = "debug",
        skip_all,
        fields(len = bytes.len())
    )]
    pub fn generate(&self, bytes: &[u8]) -> Result<ThumbnailResult> {
        ThumbnailTask::new(&self.backend, &self.options).run(bytes, None)
    }

    /// Like `generate`, also reporting stage timings and sizes.
    pub fn generate_with_metrics(&self, bytes: &[u8]) -> Result<(ThumbnailResult, ProcessingMetrics)> {
        let mut metrics = ProcessingMetrics::default();
        let result = ThumbnailTask::new(&self.backend, &self.options).run(bytes, Some(&mut metrics))?;
        Ok((result, metrics))
    }

    /// Generate from any source. Memory and mapped sources are read in place.
    pub fn generate_source(&self, source: &Source) -> Result<ThumbnailResult> {
        match source.as_bytes() {
            Some(bytes) => self.generate(bytes),
            None => {
                let loaded = source.load()?;
                self.generate(loaded.as_slice())
            }
        }
    }

    /// Generate from a file on disk, memory-mapping it.
    pub fn generate_file(&self, path: impl AsRef<Path>) -> Result<ThumbnailResult> {
        let source = Source::from_path(path)?;
        self.generate_source(&source)
    }

    /// Generate thumbnails for independent inputs in parallel.
    ///
    /// Returns one result per input, in input order. A failing input does
    /// not affect the others.
    pub fn generate_batch(&self, inputs: &[&[u8]]) -> Vec<Result<ThumbnailResult>> {
        pool::install(|| {
            inputs
                .par_iter()
                .map(|bytes| self.generate(bytes))
                .collect()
        })
    }
}
