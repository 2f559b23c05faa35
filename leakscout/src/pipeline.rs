//! One search job, end to end.
//!
//! ```text
//! pattern ─► matcher ─► ArtifactDir ─► OutputTriple::create ─► engine::search ─► merge
//! ```
//!
//! The output triple is created before any worker starts so that a name clash
//! aborts the job without scanning. Until the merge succeeds the triple is held
//! by a [`PendingOutput`] and removed again on any error. The artifact directory
//! is owned by this call and removed on every exit path.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::context::RunContext;
use crate::errors::{SearchError, SearchResult};
use crate::merge::{self, OutputTriple};
use crate::progress::Progress;
use crate::results::{FileRecord, RunReport};
use crate::search::artifact::ArtifactDir;
use crate::search::engine;
use crate::search::matcher::PatternMatcher;
use crate::search::processor::FileProcessor;

/// What to search for and where to put it
#[derive(Debug, Clone, Default)]
pub struct SearchJob {
    /// Raw pattern, ignored when both names are set
    pub pattern: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    /// Output path the triple is derived from; `None` prints matches to stdout
    pub output: Option<PathBuf>,
    /// Splits matched lines into users and passwords
    pub separator: Option<String>,
}

impl SearchJob {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_names(mut self, firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        self.firstname = Some(firstname.into());
        self.lastname = Some(lastname.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }
}

/// Removes a freshly created triple on drop unless the merge went through
struct PendingOutput<'a> {
    triple: Option<&'a OutputTriple>,
}

impl<'a> PendingOutput<'a> {
    fn new(triple: Option<&'a OutputTriple>) -> Self {
        Self { triple }
    }

    fn keep(mut self) {
        self.triple = None;
    }
}

impl Drop for PendingOutput<'_> {
    fn drop(&mut self) {
        if let Some(triple) = self.triple.take() {
            debug!("Removing unfinished output {}", triple.main.display());
            triple.discard();
        }
    }
}

fn artifact_dir(config: &SearchConfig) -> io::Result<ArtifactDir> {
    match &config.temp_dir {
        Some(parent) => ArtifactDir::new_in(parent),
        None => ArtifactDir::new(),
    }
}

/// Runs `job` over an already enumerated file list.
///
/// # Errors
///
/// Run-level errors only; files that fail to scan are counted in
/// [`RunReport::files_failed`]. An interrupted job returns
/// [`SearchError::Interrupted`] without merging. On any error after the output
/// files were created they are removed again, so the job can be retried.
pub fn run_search(
    files: &[FileRecord],
    job: &SearchJob,
    config: &SearchConfig,
    ctx: &RunContext,
    progress: &dyn Progress,
) -> SearchResult<RunReport> {
    let started = Instant::now();
    let matcher = PatternMatcher::for_names(
        &job.pattern,
        job.firstname.as_deref(),
        job.lastname.as_deref(),
    )?;

    let separator = job
        .separator
        .as_deref()
        .map(|s| config.encoding_mode.encode(s))
        .transpose()?;
    if separator.as_ref().is_some_and(|s| s.is_empty()) {
        return Err(SearchError::config_error("Separator must not be empty"));
    }

    if ctx.is_cancelled() {
        return Err(SearchError::Interrupted);
    }

    let artifacts = artifact_dir(config)?;
    let triple = job.output.as_deref().map(OutputTriple::create).transpose()?;
    let pending = PendingOutput::new(triple.as_ref());
    let processor = FileProcessor::new(matcher, config.encoding_mode)
        .with_cancellation(ctx.cancel_token().clone());

    let output = engine::search(
        files,
        &processor,
        &artifacts,
        config,
        ctx.cancel_token(),
        progress,
    )?;

    let stats = match &triple {
        Some(triple) => merge::merge(
            &output.results,
            &artifacts,
            triple,
            separator.as_deref(),
            progress,
        )?,
        None => {
            if separator.is_some() {
                debug!("No output file given, ignoring separator");
            }
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            merge::merge_streams(&output.results, &artifacts, &mut writer, None, progress)?
        }
    };
    pending.keep();
    artifacts.close()?;

    let report = RunReport {
        pattern: processor.matcher().pattern().to_string(),
        output: triple.map(|t| t.main),
        files_scanned: output.files_scanned(),
        files_failed: output.failures.len(),
        files_with_matches: output.files_with_matches,
        total_matches: output.total_matches,
        lines_written: stats.lines,
        elapsed: started.elapsed(),
    };
    info!(
        "Wrote {} lines for '{}' in {:?}",
        report.lines_written, report.pattern, report.elapsed
    );
    Ok(report)
}
