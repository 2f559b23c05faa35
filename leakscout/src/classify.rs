//! Content-type detection for walked files.
//!
//! The walker only needs `classify(path) -> mime`. [`MimeClassifier`] sniffs a few
//! magic numbers for the formats on the default block-list, falls back to
//! `content_inspector` to tell text from binary, and uses `mime_guess` to name the
//! type from the extension.

use content_inspector::ContentType;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const SNIFF_BUFFER_SIZE: usize = 1024;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const EMPTY: &str = "inode/x-empty";

/// Signatures checked before any heuristic, longest-prefix formats first.
const MAGIC: &[(&[u8], &str)] = &[
    (b"SQLite format 3\0", "application/x-sqlite3"),
    (b"!<arch>\ndebian-binary", "application/vnd.debian.binary-package"),
    (b"\x7fELF", "application/x-executable"),
    (b"MZ\x90\0", "application/x-dosexec"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"P6\n", "image/x-portable-pixmap"),
    (b"\x78\x01", "application/zlib"),
    (b"\x78\x9c", "application/zlib"),
    (b"\x78\xda", "application/zlib"),
];

/// Maps a file to a MIME-type string.
pub trait Classifier: Send + Sync {
    /// Returns `Ok(None)` when the type cannot be determined.
    fn classify(&self, path: &Path) -> io::Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl MimeClassifier {
    pub fn new() -> Self {
        Self
    }

    fn classify_buffer(path: &Path, head: &[u8]) -> Option<String> {
        if head.is_empty() {
            return Some(EMPTY.to_string());
        }

        if let Some((_, mime)) = MAGIC.iter().find(|(magic, _)| head.starts_with(magic)) {
            return Some(mime.to_string());
        }

        let guess = mime_guess::from_path(path).first_raw();
        match content_inspector::inspect(head) {
            ContentType::BINARY => Some(
                guess
                    .filter(|g| !g.starts_with("text/"))
                    .unwrap_or(OCTET_STREAM)
                    .to_string(),
            ),
            ContentType::UTF_8 | ContentType::UTF_8_BOM => Some(
                guess
                    .filter(|g| g.starts_with("text/") || g.starts_with("application/"))
                    .unwrap_or(TEXT_PLAIN)
                    .to_string(),
            ),
            // UTF-16/32 text is searchable only as raw bytes
            _ => guess.map(str::to_string),
        }
    }
}

impl Classifier for MimeClassifier {
    fn classify(&self, path: &Path) -> io::Result<Option<String>> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; SNIFF_BUFFER_SIZE];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(Self::classify_buffer(path, &buffer[..filled]))
    }
}
