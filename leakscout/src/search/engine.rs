use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use super::artifact::ArtifactDir;
use super::processor::FileProcessor;
use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::progress::Progress;
use crate::results::{FileRecord, ScanOutput, ScanResult};

/// Outcome of one scan task as seen by the scheduler
enum TaskOutcome {
    Done(ScanResult),
    Failed(SearchError),
    /// Never started because the run was cancelled
    Skipped,
}

/// Scans every file on a fixed-size worker pool.
///
/// Each task owns its artifact, so workers never share anything but the progress
/// bar and the metrics counters. Results come back in walk order, which is the
/// order the merger consumes them in. A failing file is recorded in
/// [`ScanOutput::failures`] and never stops the other tasks.
///
/// # Errors
///
/// - [`SearchError::NothingToScan`] when `files` is empty
/// - [`SearchError::Interrupted`] when `cancel` fired; no results are returned
/// - [`SearchError::WorkerPool`] when the pool cannot be built
pub fn search(
    files: &[FileRecord],
    processor: &FileProcessor,
    artifacts: &ArtifactDir,
    config: &SearchConfig,
    cancel: &CancellationToken,
    progress: &dyn Progress,
) -> SearchResult<ScanOutput> {
    if files.is_empty() {
        return Err(SearchError::NothingToScan);
    }

    let thread_count = config.thread_count.get();
    info!(
        "Searching {} files for '{}' with {} workers",
        files.len(),
        processor.matcher().pattern(),
        thread_count
    );
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .thread_name(|i| format!("leakscout-scan-{}", i))
        .build()?;

    progress.start("Search pattern", files.len() as u64);
    let outcomes: Vec<TaskOutcome> = pool.install(|| {
        files
            .par_iter()
            .map(|record| {
                if cancel.is_cancelled() {
                    return TaskOutcome::Skipped;
                }
                let outcome = match processor.scan(record, artifacts) {
                    Ok(result) => TaskOutcome::Done(result),
                    Err(e) => TaskOutcome::Failed(e),
                };
                progress.advance();
                outcome
            })
            .collect()
    });
    progress.finish();

    if cancel.is_cancelled() {
        warn!("Search interrupted, discarding partial results");
        return Err(SearchError::Interrupted);
    }

    let mut output = ScanOutput::new();
    for (record, outcome) in files.iter().zip(outcomes) {
        match outcome {
            TaskOutcome::Done(result) => output.add_scan_result(result),
            TaskOutcome::Failed(e) if e.is_per_file() => {
                debug!("Recording failure for {}", record.path.display());
                output.add_failure(record.path.clone(), e);
            }
            TaskOutcome::Failed(e) => return Err(e),
            TaskOutcome::Skipped => return Err(SearchError::Interrupted),
        }
    }

    processor.metrics().log_stats();
    info!(
        "{} matches were found in {} files ({} failed)",
        output.total_matches,
        output.files_with_matches,
        output.failures.len()
    );
    Ok(output)
}
