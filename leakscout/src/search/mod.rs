/// Per-file scanning and the worker pool that drives it.
///
/// One scan task per walked file runs on a rayon pool sized by
/// [`SearchConfig::thread_count`](crate::SearchConfig). Each task reads its file
/// line by line and appends matching lines to its own artifact:
///
/// ```text
/// files ─par_iter─► FileProcessor::scan ─► <artifact dir>/<index>_<encoded path>
///                           │
///                           └─► ScanResult { artifact, matches, .. }
/// ```
///
/// # Read strategies
///
/// - below 32KB the file is read whole
/// - up to 10MB it goes through a `BufReader`
/// - anything larger is memory-mapped
///
/// The matcher picks a literal `contains` for simple patterns and a compiled regex
/// otherwise; compiled patterns are cached for the lifetime of the process.
pub mod artifact;
pub mod engine;
pub mod matcher;
pub mod processor;

pub use artifact::ArtifactDir;
pub use engine::search;
pub use matcher::PatternMatcher;
pub use processor::FileProcessor;
