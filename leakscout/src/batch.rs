use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::context::RunContext;
use crate::errors::{SearchError, SearchResult};
use crate::person::Person;
use crate::pipeline::{run_search, SearchJob};
use crate::progress::Progress;
use crate::results::{BatchReport, FileRecord, PersonOutcome};

/// Runs one search per person over the same file list.
///
/// The walk is not repeated: every person is searched in `files`, which the caller
/// enumerated once. A person whose run fails is recorded in the report and the batch
/// moves on to the next one. Only an interrupt stops the batch.
///
/// `progress` is handed to each person's scan and merge; `people_progress` advances
/// once per person.
#[allow(clippy::too_many_arguments)]
pub fn run_batch(
    people: &[Person],
    files: &[FileRecord],
    pattern: &str,
    separator: Option<&str>,
    config: &SearchConfig,
    ctx: &RunContext,
    progress: &dyn Progress,
    people_progress: &dyn Progress,
) -> SearchResult<BatchReport> {
    let mut report = BatchReport::default();
    people_progress.start("People", people.len() as u64);

    for person in people {
        let name = person.display_name();
        info!("Searching for {}", name);

        let mut job = SearchJob::new(pattern)
            .with_names(person.firstname.as_str(), person.lastname.as_str())
            .with_output(person.output.as_path());
        job.separator = separator.map(str::to_string);

        match run_search(files, &job, config, ctx, progress) {
            Ok(run) => report.people.push(PersonOutcome {
                name,
                report: Some(run),
                error: None,
            }),
            Err(SearchError::Interrupted) => {
                people_progress.finish();
                return Err(SearchError::Interrupted);
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                report.people.push(PersonOutcome {
                    name,
                    report: None,
                    error: Some(e.to_string()),
                });
            }
        }
        people_progress.advance();
    }
    people_progress.finish();

    info!(
        "Batch finished: {} succeeded, {} failed, {} matches",
        report.succeeded(),
        report.failed(),
        report.total_matches()
    );
    Ok(report)
}
