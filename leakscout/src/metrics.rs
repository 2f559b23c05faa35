use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::search::processor::{LARGE_FILE_THRESHOLD, SMALL_FILE_THRESHOLD};

/// Counters shared by all scan workers of a run
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    bytes_read: Arc<AtomicU64>,
    lines_read: Arc<AtomicU64>,
    lines_matched: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,

    // File processing metrics
    small_files_processed: Arc<AtomicU64>,
    buffered_files_processed: Arc<AtomicU64>,
    mmap_files_processed: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            bytes_read: Arc::new(AtomicU64::new(0)),
            lines_read: Arc::new(AtomicU64::new(0)),
            lines_matched: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            small_files_processed: Arc::new(AtomicU64::new(0)),
            buffered_files_processed: Arc::new(AtomicU64::new(0)),
            mmap_files_processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records file processing type
    pub fn record_file_processing(&self, size: u64) {
        self.bytes_read.fetch_add(size, Ordering::Relaxed);
        if size < SMALL_FILE_THRESHOLD {
            self.small_files_processed.fetch_add(1, Ordering::Relaxed);
        } else if size >= LARGE_FILE_THRESHOLD {
            self.mmap_files_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.buffered_files_processed
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_lines(&self, read: u64, matched: u64) {
        self.lines_read.fetch_add(read, Ordering::Relaxed);
        self.lines_matched.fetch_add(matched, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_matched: self.lines_matched.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            small_files: self.small_files_processed.load(Ordering::Relaxed),
            buffered_files: self.buffered_files_processed.load(Ordering::Relaxed),
            mmap_files: self.mmap_files_processed.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Bytes read: {}\n\
             Lines read/matched: {}/{}\n\
             Failed files: {}\n\
             Files processed (small/buffered/mmap): {}/{}/{}",
            stats.bytes_read,
            stats.lines_read,
            stats.lines_matched,
            stats.failures,
            stats.small_files,
            stats.buffered_files,
            stats.mmap_files
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_read: u64,
    pub lines_read: u64,
    pub lines_matched: u64,
    pub failures: u64,
    pub small_files: u64,
    pub buffered_files: u64,
    pub mmap_files: u64,
}
