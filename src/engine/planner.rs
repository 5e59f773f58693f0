// src/engine/planner.rs
//
// Thumbnail planning: source validation, pass-through detection and
// aspect-preserving target sizing. Pure computation, no pixels.

use crate::engine::decoder::SourceFormat;
use crate::engine::firewall::SourceLimits;
use crate::error::{Result, ThumbnailError};
use crate::ops::ThumbnailOptions;
use tracing::debug;

/// The coarse sampling pass stops at this multiple of the target size.
pub const INTERMEDIATE_FACTOR: u32 = 4;

/// Resolved geometry for one request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThumbnailPlan {
    pub target_width: u32,
    pub target_height: u32,
    /// Source already fits the box; encode it unchanged.
    pub pass_through: bool,
    /// Size of the coarse sample. Unused when `pass_through`.
    pub intermediate_width: u32,
    pub intermediate_height: u32,
    /// Source length per output pixel along the dominant axis (1.0 for pass-through).
    pub scale: f64,
}

impl ThumbnailPlan {
    fn pass_through(width: u32, height: u32) -> Self {
        Self {
            target_width: width,
            target_height: height,
            pass_through: true,
            intermediate_width: width,
            intermediate_height: height,
            scale: 1.0,
        }
    }

    pub fn target_dims(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Coarse sample size, or `None` when no resampling happens.
    pub fn intermediate_dims(&self) -> Option<(u32, u32)> {
        (!self.pass_through).then_some((self.intermediate_width, self.intermediate_height))
    }
}

/// Plan a thumbnail for a source of the given size and format.
///
/// Validation uses the configured limits (skipped for formats rasterized at
/// decode time). A source that fits the box on both axes passes through.
/// Otherwise the dominant axis is scaled to the box exactly and the other
/// axis follows with the same scale, floored and clamped to at least 1.
///
/// Zero target dimensions are rejected by `ThumbnailOptions::validate`
/// before this is reached.
pub fn plan(
    source_width: u32,
    source_height: u32,
    source_format: &SourceFormat,
    options: &ThumbnailOptions,
) -> Result<ThumbnailPlan> {
    SourceLimits::from_options(options).enforce(source_width, source_height, source_format)?;

    if source_width <= options.target_width && source_height <= options.target_height {
        debug!(
            target: "thumbnailer::planner",
            width = source_width,
            height = source_height,
            "source fits, pass-through"
        );
        return Ok(ThumbnailPlan::pass_through(source_width, source_height));
    }

    let (dominant, dominant_target) = if source_width >= source_height {
        (source_width, options.target_width)
    } else {
        (source_height, options.target_height)
    };

    // len / scale == len * dominant_target / dominant; integer division gives
    // the exact floor.
    let scale_axis = |len: u32| -> u32 {
        let scaled = len as u64 * dominant_target as u64 / dominant as u64;
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    };
    let target_width = scale_axis(source_width);
    let target_height = scale_axis(source_height);
    let scale = dominant as f64 / dominant_target as f64;

    let (Some(intermediate_width), Some(intermediate_height)) = (
        target_width.checked_mul(INTERMEDIATE_FACTOR),
        target_height.checked_mul(INTERMEDIATE_FACTOR),
    ) else {
        return Err(ThumbnailError::sample_failed(
            (source_width, source_height),
            (target_width, target_height),
            format!("intermediate of {INTERMEDIATE_FACTOR}x {target_width}x{target_height} overflows u32"),
        ));
    };

    let plan = ThumbnailPlan {
        target_width,
        target_height,
        pass_through: false,
        intermediate_width,
        intermediate_height,
        scale,
    };
    debug!(
        target: "thumbnailer::planner",
        source_width,
        source_height,
        scale,
        target_width,
        target_height,
        intermediate_width = plan.intermediate_width,
        intermediate_height = plan.intermediate_height,
        "planned resample"
    );
    Ok(plan)
}
