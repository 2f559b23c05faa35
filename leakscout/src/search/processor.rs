use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{trace, warn};

use super::artifact::{artifact_name, ArtifactDir};
use super::matcher::PatternMatcher;
use crate::cancel::CancellationToken;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;
use crate::results::{FileRecord, ScanResult};

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB
/// Lines between cancellation checks inside one file
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Decodes one line (terminator already stripped) for matching
fn decode_line<'a>(
    bytes: &'a [u8],
    path: &Path,
    line: usize,
    encoding_mode: EncodingMode,
    scratch: &'a mut String,
) -> SearchResult<Cow<'a, str>> {
    match encoding_mode {
        EncodingMode::Latin1 => {
            if bytes.is_ascii() {
                // ASCII is valid UTF-8 and maps byte-for-byte
                return Ok(Cow::Borrowed(std::str::from_utf8(bytes).unwrap_or_default()));
            }
            scratch.clear();
            scratch.extend(bytes.iter().map(|&b| char::from(b)));
            Ok(Cow::Borrowed(scratch.as_str()))
        }
        EncodingMode::Utf8 => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|_| SearchError::decode_error(path, line, encoding_mode.name())),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            if let Cow::Owned(_) = cow {
                trace!("Invalid UTF-8 replaced in {} line {}", path.display(), line);
            }
            Ok(cow)
        }
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Matches lines of one file and appends hits to its artifact
struct LineSink<'a> {
    processor: &'a FileProcessor,
    path: &'a Path,
    writer: BufWriter<File>,
    scratch: String,
    terminated: String,
    line_number: usize,
    matches: usize,
}

impl LineSink<'_> {
    /// `raw` includes its terminator, which is written through unchanged
    fn feed(&mut self, raw: &[u8]) -> SearchResult<()> {
        self.line_number += 1;
        if self.line_number % CANCEL_CHECK_INTERVAL == 0 && self.processor.is_cancelled() {
            return Err(SearchError::Interrupted);
        }

        let line = strip_terminator(raw);
        let text = decode_line(
            line,
            self.path,
            self.line_number,
            self.processor.encoding_mode,
            &mut self.scratch,
        )?;
        let matcher = &self.processor.matcher;
        let hit = if line.len() < raw.len() {
            matcher.is_match_terminated(&text, &mut self.terminated)
        } else {
            matcher.is_match(&text)
        };
        if hit {
            self.writer.write_all(raw)?;
            self.matches += 1;
        }
        Ok(())
    }

    fn finish(mut self) -> SearchResult<(usize, usize)> {
        self.writer.flush()?;
        Ok((self.line_number, self.matches))
    }
}

/// Scans single files for the effective pattern
#[derive(Debug)]
pub struct FileProcessor {
    matcher: PatternMatcher,
    metrics: ScanMetrics,
    encoding_mode: EncodingMode,
    cancel: Option<CancellationToken>,
}

impl FileProcessor {
    /// Creates a new FileProcessor with the given pattern matcher
    pub fn new(matcher: PatternMatcher, encoding_mode: EncodingMode) -> Self {
        Self {
            matcher,
            metrics: ScanMetrics::new(),
            encoding_mode,
            cancel: None,
        }
    }

    /// Lets long scans stop early when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Process a small file by reading it whole
    fn process_small_file(&self, path: &Path, sink: &mut LineSink<'_>) -> SearchResult<()> {
        trace!("Using simple file processing for: {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| SearchError::file_io(path, e))?;
        for line in bytes.split_inclusive(|&b| b == b'\n') {
            sink.feed(line)?;
        }
        Ok(())
    }

    /// Process a file using buffered reading
    fn process_file_buffered(&self, file: File, path: &Path, sink: &mut LineSink<'_>) -> SearchResult<()> {
        trace!("Using buffered processing for: {}", path.display());
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut line = Vec::with_capacity(256);
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| SearchError::file_io(path, e))?;
            if n == 0 {
                break;
            }
            sink.feed(&line)?;
        }
        Ok(())
    }

    /// Process a file using memory mapping
    fn process_mmap_file(&self, file: File, path: &Path, sink: &mut LineSink<'_>) -> SearchResult<()> {
        trace!("Using memory mapping for: {}", path.display());
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::file_io(path, e))?;
        for line in mmap.split_inclusive(|&b| b == b'\n') {
            sink.feed(line)?;
        }
        Ok(())
    }

    /// Scans one file, writing every matching line verbatim into its artifact
    pub fn scan(&self, record: &FileRecord, artifacts: &ArtifactDir) -> SearchResult<ScanResult> {
        let path = record.path.as_path();
        trace!("Processing file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::file_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| SearchError::file_io(path, e))?
            .len();

        let name = artifact_name(record);
        let mut sink = LineSink {
            processor: self,
            path,
            writer: BufWriter::new(artifacts.open_append(&name)?),
            scratch: String::new(),
            terminated: String::new(),
            line_number: 0,
            matches: 0,
        };

        let scanned = if size < SMALL_FILE_THRESHOLD {
            drop(file);
            self.process_small_file(path, &mut sink)
        } else if size >= LARGE_FILE_THRESHOLD {
            self.process_mmap_file(file, path, &mut sink)
        } else {
            self.process_file_buffered(file, path, &mut sink)
        };
        if let Err(e) = scanned {
            self.metrics.record_failure();
            if e.is_per_file() {
                warn!("Aborting scan of {}: {}", path.display(), e);
            }
            return Err(e);
        }

        let (lines, matches) = sink.finish()?;
        self.metrics.record_file_processing(size);
        self.metrics.record_lines(lines as u64, matches as u64);
        trace!("Found {} matches in file {}", matches, path.display());

        Ok(ScanResult {
            artifact: name,
            source: record.path.clone(),
            matches,
            bytes_read: size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(path: PathBuf) -> FileRecord {
        FileRecord {
            index: 0,
            path,
            mime: None,
        }
    }

    fn processor(pattern: &str, mode: EncodingMode) -> FileProcessor {
        FileProcessor::new(PatternMatcher::new(pattern).unwrap(), mode)
    }

    #[test]
    fn test_scan_writes_matching_lines_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("combo.txt");
        fs::write(&path, "foo:1\nbar:2\r\nfoo:3\r\nbaz\nlast foo").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let result = processor("foo", EncodingMode::Latin1)
            .scan(&record(path.clone()), &artifacts)
            .unwrap();

        assert_eq!(result.matches, 3);
        assert_eq!(result.source, path);
        let written = fs::read(artifacts.artifact_path(&result.artifact)).unwrap();
        assert_eq!(written, b"foo:1\nfoo:3\r\nlast foo");
    }

    #[test]
    fn test_pattern_can_match_line_break() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("breaks.txt");
        fs::write(&path, "foo\nfoo bar\r\nbar\nfoo").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let result = processor(r"foo\s", EncodingMode::Utf8)
            .scan(&record(path), &artifacts)
            .unwrap();

        // The unterminated last line has no break to match
        assert_eq!(result.matches, 2);
        let written = fs::read(artifacts.artifact_path(&result.artifact)).unwrap();
        assert_eq!(written, b"foo\nfoo bar\r\n");
    }

    #[test]
    fn test_scan_without_matches_leaves_empty_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty-hit.txt");
        fs::write(&path, "nothing here\n").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let result = processor("foo", EncodingMode::Latin1)
            .scan(&record(path), &artifacts)
            .unwrap();

        assert_eq!(result.matches, 0);
        assert_eq!(fs::read(artifacts.artifact_path(&result.artifact)).unwrap(), b"");
    }

    #[test]
    fn test_latin1_never_fails_and_preserves_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.txt");
        fs::write(&path, b"jos\xe9@mail.com:caf\xe9\n\xff\xfe garbage\n").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let result = processor("jos\u{e9}@", EncodingMode::Latin1)
            .scan(&record(path), &artifacts)
            .unwrap();

        assert_eq!(result.matches, 1);
        let written = fs::read(artifacts.artifact_path(&result.artifact)).unwrap();
        assert_eq!(written, b"jos\xe9@mail.com:caf\xe9\n");
    }

    #[test]
    fn test_strict_utf8_reports_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        fs::write(&path, b"ok line\nbad \xff line\n").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let processor = processor("line", EncodingMode::Utf8);
        let err = processor.scan(&record(path), &artifacts).unwrap_err();

        assert!(matches!(err, SearchError::DecodeError { line: 2, .. }));
        assert!(err.is_per_file());
        assert_eq!(processor.metrics().get_stats().failures, 1);
    }

    #[test]
    fn test_lossy_mode_matches_around_invalid_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lossy.txt");
        fs::write(&path, b"bad \xff foo\n").unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let result = processor("foo", EncodingMode::Lossy)
            .scan(&record(path), &artifacts)
            .unwrap();
        assert_eq!(result.matches, 1);
    }

    #[test]
    fn test_missing_file_is_per_file_error() {
        let dir = tempdir().unwrap();
        let artifacts = ArtifactDir::new().unwrap();
        let err = processor("foo", EncodingMode::Latin1)
            .scan(&record(dir.path().join("gone.txt")), &artifacts)
            .unwrap_err();
        assert!(err.is_per_file());
    }

    #[test]
    fn test_buffered_and_mmap_paths_agree() {
        let dir = tempdir().unwrap();
        let line = "user@example.com:pattern_123 filler filler filler\n";

        // ~64KB: buffered path
        let medium = dir.path().join("medium.txt");
        fs::write(&medium, line.repeat(1300)).unwrap();
        // ~11MB: mmap path
        let large = dir.path().join("large.txt");
        fs::write(&large, line.repeat(220_000)).unwrap();

        let artifacts = ArtifactDir::new().unwrap();
        let processor = processor(r"pattern_\d+", EncodingMode::Latin1);

        let medium_result = processor.scan(&record(medium), &artifacts).unwrap();
        let mut large_record = record(large);
        large_record.index = 1;
        let large_result = processor.scan(&large_record, &artifacts).unwrap();

        assert_eq!(medium_result.matches, 1300);
        assert_eq!(large_result.matches, 220_000);
        let stats = processor.metrics().get_stats();
        assert_eq!(stats.buffered_files, 1);
        assert_eq!(stats.mmap_files, 1);
        assert_eq!(stats.lines_matched, 221_300);
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.txt");
        fs::write(&path, "x\n".repeat(CANCEL_CHECK_INTERVAL + 1)).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let artifacts = ArtifactDir::new().unwrap();
        let err = processor("x", EncodingMode::Latin1)
            .with_cancellation(token)
            .scan(&record(path), &artifacts)
            .unwrap_err();
        assert!(matches!(err, SearchError::Interrupted));
    }
}
