// src/engine/firewall.rs
//
// Configured source-size limits and their enforcement.

use crate::engine::decoder::SourceFormat;
use crate::error::ThumbnailError;
use crate::ops::ThumbnailOptions;

/// Per-axis bounds on the source bitmap. `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceLimits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl SourceLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limits from configuration, where `0` disables an axis.
    pub fn from_options(options: &ThumbnailOptions) -> Self {
        let bound = |v: u32| (v != 0).then_some(v);
        Self {
            max_width: bound(options.max_source_width),
            max_height: bound(options.max_source_height),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_width.is_none() && self.max_height.is_none()
    }

    /// Reject a raster source that exceeds either bound.
    ///
    /// Width is checked first, so a source too large on both axes reports
    /// `SourceTooWide`. Formats rasterized at decode time are exempt.
    pub fn enforce(
        &self,
        width: u32,
        height: u32,
        format: &SourceFormat,
    ) -> Result<(), ThumbnailError> {
        if format.is_rasterized_at_decode() {
            tracing::trace!(
                target: "thumbnailer::planner",
                format = %format,
                width,
                height,
                "size limits skipped"
            );
            return Ok(());
        }
        if let Some(max) = self.max_width {
            if width > max {
                return Err(ThumbnailError::source_too_wide(width, max));
            }
        }
        if let Some(max) = self.max_height {
            if height > max {
                return Err(ThumbnailError::source_too_tall(height, max));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(w: u32, h: u32) -> SourceLimits {
        SourceLimits::from_options(&ThumbnailOptions::default().with_source_limits(w, h))
    }

    #[test]
    fn test_zero_means_unbounded() {
        let l = limits(0, 0);
        assert!(l.is_unbounded());
        assert!(l.enforce(u32::MAX, u32::MAX, &SourceFormat::raster("png")).is_ok());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let png = SourceFormat::raster("png");
        assert!(limits(5000, 4000).enforce(5000, 4000, &png).is_ok());
        assert!(matches!(
            limits(5000, 4000).enforce(5001, 4000, &png),
            Err(ThumbnailError::SourceTooWide { width: 5001, max: 5000 })
        ));
        assert!(matches!(
            limits(5000, 4000).enforce(5000, 4001, &png),
            Err(ThumbnailError::SourceTooTall { height: 4001, max: 4000 })
        ));
    }

    #[test]
    fn test_width_checked_before_height() {
        let err = limits(10, 10)
            .enforce(11, 11, &SourceFormat::raster("jpeg"))
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::SourceTooWide { .. }));
    }

    #[test]
    fn test_single_axis_limit() {
        let png = SourceFormat::raster("png");
        assert!(limits(0, 100).enforce(1_000_000, 100, &png).is_ok());
        assert!(limits(100, 0).enforce(101, 1, &png).is_err());
    }

    #[test]
    fn test_page_description_exempt() {
        assert!(limits(10, 10).enforce(1000, 1000, &SourceFormat::pdf()).is_ok());
    }
}
