// src/engine/io.rs
//
// Input sources: in-memory bytes, memory-mapped files and plain paths.

use crate::error::ThumbnailError;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
    /// File path for lazy loading (data is read only when needed)
    Path(PathBuf),
}

impl Source {
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Source::Memory(Arc::new(data.into()))
    }

    /// Memory-map a file. The OS pages in only what the decoder touches.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ThumbnailError> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();

        let file = File::open(path).map_err(|e| map_open_error(&display, e))?;
        let len = file
            .metadata()
            .map_err(|e| ThumbnailError::file_read_failed(display.clone(), e))?
            .len();
        // Zero-length files cannot be mapped on every platform.
        if len == 0 {
            return Ok(Source::Memory(Arc::new(Vec::new())));
        }

        // Safety: the file is assumed not to be truncated by another process
        // while the request runs.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ThumbnailError::mmap_failed(display, e))?;
        Ok(Source::Mapped(Arc::new(mmap)))
    }

    /// Load the actual bytes from the source
    /// Note: For Mapped sources, this copies. Prefer `as_bytes()`.
    pub fn load(&self) -> Result<Arc<Vec<u8>>, ThumbnailError> {
        match self {
            Source::Memory(data) => Ok(data.clone()),
            Source::Mapped(mmap) => Ok(Arc::new(mmap.as_ref().to_vec())),
            Source::Path(path) => {
                let display = path.to_string_lossy().to_string();
                let data = std::fs::read(path).map_err(|e| map_open_error(&display, e))?;
                Ok(Arc::new(data))
            }
        }
    }

    /// Get path if this is a Path source
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Source::Path(p) => Some(p),
            Source::Memory(_) | Source::Mapped(_) => None,
        }
    }

    /// Bytes without copying. `None` only for Path sources.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Source::Memory(data) => Some(data.as_slice()),
            Source::Mapped(mmap) => Some(mmap.as_ref()),
            Source::Path(_) => None,
        }
    }

    /// Length of the source data (0 for Path sources until loaded)
    pub fn len(&self) -> usize {
        match self {
            Source::Memory(data) => data.len(),
            Source::Mapped(mmap) => mmap.len(),
            Source::Path(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn map_open_error(path: &str, err: std::io::Error) -> ThumbnailError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ThumbnailError::file_not_found(path.to_string())
    } else {
        ThumbnailError::file_read_failed(path.to_string(), err)
    }
}
