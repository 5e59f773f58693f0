// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the engine Result alias and panic containment for codec calls.

use crate::error::ThumbnailError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result type used by every engine stage.
pub type EngineResult<T> = std::result::Result<T, ThumbnailError>;

/// Run a codec call, turning a panic inside it into `InternalPanic`.
///
/// The C codecs (libjpeg, libwebp) and some pure-Rust decoders can panic on
/// hostile input. A panic must never escape a request.
pub fn run_with_panic_policy<T, F>(label: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            tracing::error!(target: "thumbnailer::task", stage = label, %detail, "panic contained");
            Err(ThumbnailError::internal_panic(format!("{label}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_ok_and_err() {
        assert_eq!(run_with_panic_policy("ok", || Ok(7)).unwrap(), 7);
        let err = run_with_panic_policy::<(), _>("err", || {
            Err(ThumbnailError::corrupted_image())
        })
        .unwrap_err();
        assert!(matches!(err, ThumbnailError::CorruptedImage));
    }

    #[test]
    fn test_panic_becomes_internal_panic() {
        let err = run_with_panic_policy::<(), _>("decode:test", || panic!("boom")).unwrap_err();
        match err {
            ThumbnailError::InternalPanic { message } => {
                assert!(message.contains("decode:test"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
