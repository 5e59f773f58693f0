// src/ops.rs
//
// Per-request thumbnail configuration.
// Cheap to create and copy - nothing here touches pixels.

use crate::error::{Result, ThumbnailError};

/// Highest accepted JPEG quality.
pub const MAX_QUALITY: u8 = 100;

/// Configuration for a single thumbnail request.
///
/// Immutable for the lifetime of a request. A limit of `0` means the
/// corresponding source axis is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThumbnailOptions {
    /// Upper bound on source width (0 = unbounded)
    pub max_source_width: u32,
    /// Upper bound on source height (0 = unbounded)
    pub max_source_height: u32,
    /// Bounding box width
    pub target_width: u32,
    /// Bounding box height
    pub target_height: u32,
    /// JPEG output when true, PNG output when false
    pub output_is_lossy: bool,
    /// Encoder quality (1-100), only used for lossy output
    pub lossy_quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_source_width: 0,
            max_source_height: 0,
            target_width: 150,
            target_height: 150,
            output_is_lossy: false,
            lossy_quality: 80,
        }
    }
}

impl ThumbnailOptions {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn with_source_limits(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_source_width = max_width;
        self.max_source_height = max_height;
        self
    }

    /// Switch to JPEG output at the given quality.
    pub fn with_lossy(mut self, quality: u8) -> Self {
        self.output_is_lossy = true;
        self.lossy_quality = quality;
        self
    }

    /// Switch to PNG output. The stored quality is kept but ignored.
    pub fn with_lossless(mut self) -> Self {
        self.output_is_lossy = false;
        self
    }

    /// Get a built-in preset by name
    ///
    /// - `standard`: 150x150 box, PNG output, sources up to 10000x10000
    /// - `large`: 400x400 box, JPEG quality 85, sources up to 20000x20000
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "standard" => Ok(Self::new(150, 150).with_source_limits(10_000, 10_000)),
            "large" => Ok(Self::new(400, 400)
                .with_source_limits(20_000, 20_000)
                .with_lossy(85)),
            _ => Err(ThumbnailError::invalid_preset(name.to_string())),
        }
    }

    /// Reject configurations the planner assumes never happen.
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(ThumbnailError::invalid_argument(
                "target_width",
                "0",
                "bounding box must be at least 1 pixel wide",
            ));
        }
        if self.target_height == 0 {
            return Err(ThumbnailError::invalid_argument(
                "target_height",
                "0",
                "bounding box must be at least 1 pixel tall",
            ));
        }
        // Quality only matters when it will be handed to the JPEG encoder.
        if self.output_is_lossy && !(1..=MAX_QUALITY).contains(&self.lossy_quality) {
            return Err(ThumbnailError::invalid_argument(
                "lossy_quality",
                self.lossy_quality.to_string(),
                "quality must be between 1 and 100",
            ));
        }
        Ok(())
    }

    /// Encoding selected by this configuration.
    pub fn output_format(&self) -> OutputFormat {
        if self.output_is_lossy {
            OutputFormat::Jpeg {
                quality: self.lossy_quality,
            }
        } else {
            OutputFormat::Png
        }
    }
}

/// Output format for encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lossless_150_box_without_limits() {
        let opts = ThumbnailOptions::default();
        assert_eq!((opts.target_width, opts.target_height), (150, 150));
        assert_eq!((opts.max_source_width, opts.max_source_height), (0, 0));
        assert_eq!(opts.output_format(), OutputFormat::Png);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_lossy_selects_jpeg_with_quality() {
        let opts = ThumbnailOptions::new(200, 200).with_lossy(80);
        assert_eq!(opts.output_format(), OutputFormat::Jpeg { quality: 80 });
        assert_eq!(opts.output_format().as_str(), "jpeg");
    }

    #[test]
    fn test_lossless_ignores_quality() {
        let mut opts = ThumbnailOptions::new(200, 200).with_lossy(0).with_lossless();
        assert_eq!(opts.output_format(), OutputFormat::Png);
        assert!(opts.validate().is_ok());
        opts.lossy_quality = 255;
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let err = ThumbnailOptions::new(0, 100).validate().unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument { ref name, .. } if name == "target_width"));

        let err = ThumbnailOptions::new(100, 0).validate().unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument { ref name, .. } if name == "target_height"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        assert!(ThumbnailOptions::new(10, 10).with_lossy(0).validate().is_err());
        assert!(ThumbnailOptions::new(10, 10).with_lossy(101).validate().is_err());
        assert!(ThumbnailOptions::new(10, 10).with_lossy(1).validate().is_ok());
        assert!(ThumbnailOptions::new(10, 10).with_lossy(100).validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let standard = ThumbnailOptions::preset("standard").unwrap();
        assert_eq!(standard.output_format(), OutputFormat::Png);
        assert_eq!(standard.max_source_width, 10_000);

        let large = ThumbnailOptions::preset("LARGE").unwrap();
        assert_eq!(large.output_format(), OutputFormat::Jpeg { quality: 85 });
        assert_eq!((large.target_width, large.target_height), (400, 400));

        assert!(matches!(
            ThumbnailOptions::preset("poster"),
            Err(ThumbnailError::InvalidPreset { .. })
        ));
    }
}
