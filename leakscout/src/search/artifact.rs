//! Scoped storage for per-file intermediate results.
//!
//! Each scan task appends its matching lines to one artifact file inside an
//! [`ArtifactDir`]. The directory lives as long as the value: dropping it (normal
//! return, `?` propagation, interrupt, panic unwinding) removes every artifact.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::results::FileRecord;

const MAX_ENCODED_LEN: usize = 120;

#[derive(Debug)]
pub struct ArtifactDir {
    dir: TempDir,
}

impl ArtifactDir {
    /// Creates a fresh directory under the system temp location
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("leakscout-").tempdir()?;
        debug!("Created temporary dir at {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Creates the directory inside `parent` instead of the system temp location
    pub fn new_in(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("leakscout-")
            .tempdir_in(parent)?;
        debug!("Created temporary dir at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Opens (creating if needed) the artifact for appending
    pub fn open_append(&self, name: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.artifact_path(name))
    }

    pub fn open_read(&self, name: &str) -> io::Result<File> {
        File::open(self.artifact_path(name))
    }

    /// Removes the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().inspect_err(|e| {
            warn!("Failed to remove {}: {}", path.display(), e);
        })
    }
}

/// Name of the artifact holding the matches of `record`.
///
/// The walk index makes the name unique within a run; the encoded path keeps it
/// readable. Separators become `-`, dots `_`, anything else outside `[A-Za-z0-9_-]`
/// becomes `_`.
pub fn artifact_name(record: &FileRecord) -> String {
    let mut encoded: String = record
        .path
        .to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect();

    let trimmed = encoded.trim_start_matches('-').len();
    encoded.drain(..encoded.len() - trimmed);

    // Keep the tail: file names are more telling than the root prefix
    if encoded.len() > MAX_ENCODED_LEN {
        encoded.drain(..encoded.len() - MAX_ENCODED_LEN);
    }
    format!("{:06}_{}", record.index, encoded)
}
