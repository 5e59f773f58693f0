// src/engine/tasks.rs
//
// One thumbnail request: decode -> validate -> (pass-through | sample -> resize)
// -> encode, with stage tracing and optional metrics.

use crate::engine::backend::ThumbnailBackend;
use crate::engine::decoder::SourceFormat;
use crate::engine::planner::{self, ThumbnailPlan};
use crate::engine::MAX_PIXELS;
use crate::error::{Result, ThumbnailError};
use crate::ops::{OutputFormat, ThumbnailOptions};
use crate::{ProcessingMetrics, PROCESSING_METRICS_VERSION};
use image::GenericImageView;
use std::time::Instant;
use tracing::debug;

/// Where a request currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStage {
    Decoding,
    Validating,
    PassThrough,
    Sampling,
    Resizing,
    Encoding,
    Done,
}

impl TaskStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decoding => "decoding",
            Self::Validating => "validating",
            Self::PassThrough => "pass_through",
            Self::Sampling => "sampling",
            Self::Resizing => "resizing",
            Self::Encoding => "encoding",
            Self::Done => "done",
        }
    }
}

/// Encoded thumbnail. The caller owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResult {
    pub width: u32,
    pub height: u32,
    pub encoded_bytes: Vec<u8>,
    pub byte_count: usize,
    pub format: OutputFormat,
    pub source_format: SourceFormat,
}

/// Helper for unified metrics collection.
/// Measures decode -> resample -> encode in milliseconds and sets I/O sizes in one place.
struct MetricsRecorder<'m> {
    metrics: Option<&'m mut ProcessingMetrics>,
    start_total: Instant,
    stage_start: Instant,
    input_size: u64,
}

impl<'m> MetricsRecorder<'m> {
    fn new(metrics: Option<&'m mut ProcessingMetrics>, input_size: u64) -> Self {
        let now = Instant::now();
        Self {
            metrics,
            start_total: now,
            stage_start: now,
            input_size,
        }
    }

    fn mark_decode_done(&mut self) {
        if let Some(m) = self.metrics.as_deref_mut() {
            m.decode_ms = self.stage_start.elapsed().as_secs_f64() * 1000.0;
            self.stage_start = Instant::now();
        }
    }

    fn mark_resample_done(&mut self) {
        if let Some(m) = self.metrics.as_deref_mut() {
            m.resample_ms = self.stage_start.elapsed().as_secs_f64() * 1000.0;
            self.stage_start = Instant::now();
        }
    }

    fn finalize(
        &mut self,
        output_len: usize,
        source_format: &SourceFormat,
        output_format: OutputFormat,
        pass_through: bool,
    ) {
        if let Some(m) = self.metrics.as_deref_mut() {
            m.encode_ms = self.stage_start.elapsed().as_secs_f64() * 1000.0;
            m.total_ms = self.start_total.elapsed().as_secs_f64() * 1000.0;
            m.version = PROCESSING_METRICS_VERSION.to_string();

            m.bytes_in = self.input_size;
            m.bytes_out = output_len as u64;
            m.compression_ratio = if m.bytes_in > 0 {
                m.bytes_out as f64 / m.bytes_in as f64
            } else {
                0.0
            };

            m.format_in = Some(source_format.name().to_string());
            m.format_out = output_format.as_str().to_string();
            m.pass_through = pass_through;
        }
    }
}

/// A single request against a backend.
///
/// Every intermediate buffer is moved into the next stage, so an early
/// return drops whatever was alive at that point.
pub struct ThumbnailTask<'a, B: ThumbnailBackend + ?Sized> {
    backend: &'a B,
    options: &'a ThumbnailOptions,
    stage: TaskStage,
}

impl<'a, B: ThumbnailBackend + ?Sized> ThumbnailTask<'a, B> {
    pub fn new(backend: &'a B, options: &'a ThumbnailOptions) -> Self {
        Self {
            backend,
            options,
            stage: TaskStage::Decoding,
        }
    }

    pub fn stage(&self) -> TaskStage {
        self.stage
    }

    fn enter(&mut self, next: TaskStage) {
        debug!(
            target: "thumbnailer::task",
            from = self.stage.as_str(),
            to = next.as_str(),
            "stage transition"
        );
        self.stage = next;
    }

    /// Run the request to completion or to the first failure.
    pub fn run(
        mut self,
        bytes: &[u8],
        metrics: Option<&mut ProcessingMetrics>,
    ) -> Result<ThumbnailResult> {
        let result = self.run_stages(bytes, metrics);
        if let Err(err) = &result {
            debug!(
                target: "thumbnailer::task",
                stage = self.stage.as_str(),
                code = err.code(),
                error = %err,
                "request failed"
            );
        }
        result
    }

    fn run_stages(
        &mut self,
        bytes: &[u8],
        metrics: Option<&mut ProcessingMetrics>,
    ) -> Result<ThumbnailResult> {
        self.options.validate()?;
        let mut recorder = MetricsRecorder::new(metrics, bytes.len() as u64);

        // 1. Decode
        let decoded = self.backend.decode(bytes)?;
        recorder.mark_decode_done();
        debug!(
            target: "thumbnailer::task",
            width = decoded.width(),
            height = decoded.height(),
            format = %decoded.format(),
            "decoded"
        );

        // 2. Plan
        self.enter(TaskStage::Validating);
        let plan = planner::plan(
            decoded.width(),
            decoded.height(),
            decoded.format(),
            self.options,
        )?;
        let (image, source_format) = decoded.into_parts();

        // 3. Resample
        let image = if plan.pass_through {
            self.enter(TaskStage::PassThrough);
            image
        } else {
            self.enter(TaskStage::Sampling);
            ensure_intermediate_fits(&plan, image.dimensions())?;
            let sampled =
                self.backend
                    .sample(image, plan.intermediate_width, plan.intermediate_height)?;
            self.enter(TaskStage::Resizing);
            let resized = self
                .backend
                .resize(sampled, plan.target_width, plan.target_height)?;
            if resized.dimensions() != plan.target_dims() {
                return Err(ThumbnailError::resize_failed(
                    (plan.intermediate_width, plan.intermediate_height),
                    plan.target_dims(),
                    format!(
                        "backend produced {}x{}",
                        resized.width(),
                        resized.height()
                    ),
                ));
            }
            resized
        };
        recorder.mark_resample_done();

        // 4. Encode
        self.enter(TaskStage::Encoding);
        let format = self.options.output_format();
        let encoded = self.backend.encode(&image, format)?;
        drop(image);

        self.enter(TaskStage::Done);
        recorder.finalize(encoded.len(), &source_format, format, plan.pass_through);

        Ok(ThumbnailResult {
            width: plan.target_width,
            height: plan.target_height,
            byte_count: encoded.len(),
            encoded_bytes: encoded,
            format,
            source_format,
        })
    }
}

/// The coarse sample is the largest buffer a request allocates. Refuse it
/// up front rather than letting the allocator abort.
fn ensure_intermediate_fits(plan: &ThumbnailPlan, source_dims: (u32, u32)) -> Result<()> {
    let pixels = plan.intermediate_width as u64 * plan.intermediate_height as u64;
    if pixels > MAX_PIXELS {
        return Err(ThumbnailError::sample_failed(
            source_dims,
            (plan.intermediate_width, plan.intermediate_height),
            format!("intermediate of {pixels} pixels exceeds limit of {MAX_PIXELS}"),
        ));
    }
    Ok(())
}
