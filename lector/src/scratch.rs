//! Request-scoped scratch storage.
//!
//! Each `/ocr` request acquires a `RequestScratch` before touching the
//! upload and holds it for the duration of the request. The backing
//! temp directory is removed when the value drops, so staged files are
//! released exactly once on every exit path, error paths included.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// A private temp directory holding one request's input image and its
/// processed derivative.
pub struct RequestScratch {
    dir: TempDir,
}

impl RequestScratch {
    /// Acquire a scratch directory. Failure here is a resource error
    /// and must be surfaced, never swallowed.
    pub fn acquire() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("lector-").tempdir()?;
        Ok(Self { dir })
    }

    /// Write `bytes` under `name` inside the scratch directory and
    /// return the staged file's path. The path stays valid until the
    /// scratch drops.
    pub fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
