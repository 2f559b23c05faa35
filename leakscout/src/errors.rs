/// Error types for leakscout.
///
/// Errors fall into two groups:
///
/// 1. **Run-level errors** abort a run before (or instead of) merging: bad
///    configuration, a missing source directory, pre-existing output files, an
///    invalid pattern, or a user interrupt.
///
/// 2. **Per-file errors** are produced by a single scan task. The scheduler collects
///    them next to the successful results and never lets one of them abort the pool:
///    ```rust,ignore
///    match scan(&record, &matcher, &artifacts) {
///        Ok(result) => output.add_scan_result(result),
///        Err(e) if e.is_per_file() => output.add_failure(record.path.clone(), e),
///        Err(e) => return Err(e),
///    }
///    ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while walking, scanning or merging
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No such file or directory: {0}")]
    NotFound(PathBuf),
    #[error("There is already a file with that name: {0}")]
    AlreadyExists(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(
        "Cannot decode line {line} of {path} as {encoding}; \
         use --encoding latin1 or add the file type to the block-list"
    )]
    DecodeError {
        path: PathBuf,
        line: usize,
        encoding: &'static str,
    },
    #[error("Failed to read {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No files to scan")]
    NothingToScan,
    #[error("Interrupted")]
    Interrupted,
    #[error("Failed to load configuration: {0}")]
    LoadConfig(#[from] config::ConfigError),
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn decode_error(path: impl Into<PathBuf>, line: usize, encoding: &'static str) -> Self {
        Self::DecodeError {
            path: unify_path(&path.into()),
            line,
            encoding,
        }
    }

    /// Maps an IO error on a source file to the matching per-file variant.
    pub fn file_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::FileIo {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// True for errors that concern a single source file and must not fail the run.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::DecodeError { .. } | Self::FileIo { .. }
        )
    }
}
