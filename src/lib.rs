// lib.rs
//
// thumbnailer: bounded, aspect-preserving thumbnails
//
// Per request:
// - Decode once, with header-first decompression-bomb checks
// - Reject sources over the configured bitmap limits
// - Coarse nearest sample to 4x the target, then one box-filter pass
// - JPEG for lossy output, fast unfiltered PNG for lossless output

pub mod engine;
pub mod error;
pub mod ops;

use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};

pub use engine::{generate_thumbnail, SourceFormat, ThumbnailResult, Thumbnailer};
pub use error::{ErrorCategory, Result, ThumbnailError};
pub use ops::{OutputFormat, ThumbnailOptions};

/// Header-level facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(reader: R) -> Result<InspectMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ThumbnailError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{:?}", f).to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ThumbnailError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Read width, height and format WITHOUT decoding pixels.
pub fn inspect_header_from_bytes(data: &[u8]) -> Result<InspectMetadata> {
    if let Some(format) = engine::sniff_page_description(data) {
        return Err(ThumbnailError::unsupported_format(format.name().to_string()));
    }
    read_inspect_metadata(Cursor::new(data))
}

/// Read width, height and format from a file WITHOUT decoding pixels.
pub fn inspect_header_from_path(path: &str) -> Result<InspectMetadata> {
    use std::fs::File;

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ThumbnailError::file_not_found(path.to_string())
        } else {
            ThumbnailError::file_read_failed(path.to_string(), e)
        }
    })?;
    read_inspect_metadata(BufReader::new(file))
}

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Input formats the native backend decodes
pub fn supported_input_formats() -> Vec<String> {
    vec![
        "jpeg".to_string(),
        "jpg".to_string(),
        "png".to_string(),
        "webp".to_string(),
    ]
}

/// Output formats a thumbnail can be encoded as
pub fn supported_output_formats() -> Vec<String> {
    vec!["jpeg".to_string(), "jpg".to_string(), "png".to_string()]
}

/// Metrics payload version.
pub const PROCESSING_METRICS_VERSION: &str = "1.0.0";

/// Processing metrics for performance monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingMetrics {
    /// Schema version for compatibility negotiation
    pub version: String,
    /// Decode stage duration in milliseconds
    pub decode_ms: f64,
    /// Sample + resize duration in milliseconds (0 for pass-through)
    pub resample_ms: f64,
    /// Encode stage duration in milliseconds
    pub encode_ms: f64,
    /// Total wall-clock duration in milliseconds
    pub total_ms: f64,
    /// Input size in bytes
    pub bytes_in: u64,
    /// Output size in bytes
    pub bytes_out: u64,
    /// Compression ratio (bytes_out / bytes_in)
    pub compression_ratio: f64,
    /// Detected input format (lowercase: jpeg, png, webp, ...)
    pub format_in: Option<String>,
    /// Output format
    pub format_out: String,
    /// True when the source already fit and was encoded unchanged
    pub pass_through: bool,
}

impl Default for ProcessingMetrics {
    fn default() -> Self {
        Self {
            version: PROCESSING_METRICS_VERSION.to_string(),
            decode_ms: 0.0,
            resample_ms: 0.0,
            encode_ms: 0.0,
            total_ms: 0.0,
            bytes_in: 0,
            bytes_out: 0,
            compression_ratio: 0.0,
            format_in: None,
            format_out: String::new(),
            pass_through: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn inspect_reads_header() {
        let meta = inspect_header_from_bytes(&png(33, 21)).unwrap();
        assert_eq!(
            meta,
            InspectMetadata {
                width: 33,
                height: 21,
                format: Some("png".to_string()),
            }
        );
    }

    #[test]
    fn inspect_rejects_page_description_and_garbage() {
        assert!(matches!(
            inspect_header_from_bytes(b"%PDF-1.4 ..."),
            Err(ThumbnailError::UnsupportedFormat { .. })
        ));
        assert!(inspect_header_from_bytes(b"garbage").is_err());
    }

    #[test]
    fn inspect_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, png(5, 6)).unwrap();
        let meta = inspect_header_from_path(path.to_str().unwrap()).unwrap();
        assert_eq!((meta.width, meta.height), (5, 6));

        let missing = dir.path().join("b.png");
        assert!(matches!(
            inspect_header_from_path(missing.to_str().unwrap()),
            Err(ThumbnailError::FileNotFound { .. })
        ));
    }

    #[test]
    fn format_lists() {
        assert!(supported_input_formats().contains(&"webp".to_string()));
        assert_eq!(supported_output_formats().len(), 3);
        assert!(!version().is_empty());
    }

    #[test]
    fn metrics_default_version() {
        assert_eq!(ProcessingMetrics::default().version, PROCESSING_METRICS_VERSION);
    }
}
