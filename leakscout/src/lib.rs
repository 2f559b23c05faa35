pub mod batch;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod context;
pub mod errors;
pub mod filters;
pub mod merge;
pub mod metrics;
pub mod person;
pub mod pipeline;
pub mod progress;
pub mod results;
pub mod search;
pub mod walker;

pub use batch::run_batch;
pub use cancel::CancellationToken;
pub use classify::{Classifier, MimeClassifier};
pub use config::{ConfigOverrides, EncodingMode, SearchConfig};
pub use context::RunContext;
pub use errors::{SearchError, SearchResult};
pub use merge::OutputTriple;
pub use person::Person;
pub use pipeline::{run_search, SearchJob};
pub use progress::{NoProgress, Progress};
pub use results::{BatchReport, FileRecord, RunReport, WalkOutput};
pub use walker::enumerate;
