/// Result types passed between the walker, the scan workers, the merger and the
/// caller.
///
/// Everything here is plain owned data. Scan workers produce [`ScanResult`]s or
/// [`ScanFailure`]s and hand them back to the scheduler by value; the scheduler folds
/// them into a [`ScanOutput`], which the merger consumes exactly once.
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::SearchError;

/// A walked file that survived filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Position in walk order; also keeps artifact names unique
    pub index: usize,
    pub path: PathBuf,
    /// Classified type, `None` when the classifier could not tell
    pub mime: Option<String>,
}

/// Everything the walker found under the root
#[derive(Debug, Clone, Default)]
pub struct WalkOutput {
    /// Files to scan, in walk order
    pub files: Vec<FileRecord>,
    /// Distinct types of the included files
    pub types: BTreeSet<String>,
    /// Distinct block-listed types that were seen and skipped
    pub suppressed: BTreeSet<String>,
    /// Entries that could not be read or classified
    pub skipped: usize,
}

/// Outcome of scanning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// File name of the artifact inside the artifact directory
    pub artifact: String,
    pub source: PathBuf,
    /// Number of matching lines written to the artifact
    pub matches: usize,
    pub bytes_read: u64,
}

/// A scan task that failed; the rest of the run is unaffected
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: SearchError,
}

/// Aggregated result of scanning a file list
#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Successful scans in walk order, which is the merge order
    pub results: Vec<ScanResult>,
    pub failures: Vec<ScanFailure>,
    /// Sum of `matches` over `results`
    pub total_matches: usize,
    /// Number of files with at least one match
    pub files_with_matches: usize,
}

impl ScanOutput {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_scan_result(&mut self, result: ScanResult) {
        if result.matches > 0 {
            self.total_matches += result.matches;
            self.files_with_matches += 1;
        }
        self.results.push(result);
    }

    pub fn add_failure(&mut self, path: PathBuf, error: SearchError) {
        self.failures.push(ScanFailure { path, error });
    }

    pub fn files_scanned(&self) -> usize {
        self.results.len()
    }
}

/// Counts written by one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub artifacts: usize,
    pub lines: usize,
}

/// Summary of one search job, printed by the caller
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pattern: String,
    /// Main output file, `None` when matches went to stdout
    pub output: Option<PathBuf>,
    pub files_scanned: usize,
    pub files_failed: usize,
    pub files_with_matches: usize,
    pub total_matches: usize,
    pub lines_written: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// Outcome for one person of a batch
#[derive(Debug, Serialize)]
pub struct PersonOutcome {
    pub name: String,
    pub report: Option<RunReport>,
    /// Error message when the person's run failed
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub people: Vec<PersonOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.people.iter().filter(|p| p.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.people.len() - self.succeeded()
    }

    pub fn total_matches(&self) -> usize {
        self.people
            .iter()
            .filter_map(|p| p.report.as_ref())
            .map(|r| r.total_matches)
            .sum()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_result(source: &str, matches: usize) -> ScanResult {
        ScanResult {
            artifact: format!("000000_{}", source),
            source: PathBuf::from(source),
            matches,
            bytes_read: 100,
        }
    }

    #[test]
    fn test_scan_output_new() {
        let output = ScanOutput::new();
        assert_eq!(output.total_matches, 0);
        assert_eq!(output.files_with_matches, 0);
        assert_eq!(output.files_scanned(), 0);
        assert!(output.failures.is_empty());
    }

    #[test]
    fn test_scan_output_add_scan_result() {
        let mut output = ScanOutput::new();
        output.add_scan_result(scan_result("a.txt", 2));
        output.add_scan_result(scan_result("b.txt", 0));
        output.add_scan_result(scan_result("c.txt", 5));

        assert_eq!(output.total_matches, 7);
        assert_eq!(output.files_with_matches, 2);
        assert_eq!(output.files_scanned(), 3);
        assert_eq!(output.results[1].source, PathBuf::from("b.txt"));
    }

    #[test]
    fn test_scan_output_add_failure() {
        let mut output = ScanOutput::new();
        output.add_scan_result(scan_result("a.txt", 1));
        output.add_failure(
            PathBuf::from("locked.txt"),
            SearchError::permission_denied("locked.txt"),
        );

        assert_eq!(output.total_matches, 1);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].path, PathBuf::from("locked.txt"));
    }

    #[test]
    fn test_batch_report_counts() {
        let report = RunReport {
            pattern: "x".to_string(),
            output: None,
            files_scanned: 3,
            files_failed: 0,
            files_with_matches: 1,
            total_matches: 4,
            lines_written: 4,
            elapsed: Duration::from_millis(5),
        };
        let batch = BatchReport {
            people: vec![
                PersonOutcome {
                    name: "ada lovelace".to_string(),
                    report: Some(report),
                    error: None,
                },
                PersonOutcome {
                    name: "alan turing".to_string(),
                    report: None,
                    error: Some("There is already a file with that name".to_string()),
                },
            ],
        };

        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        assert_eq!(batch.total_matches(), 4);
    }
}
