use ignore::WalkBuilder;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::cancel::CancellationToken;
use crate::classify::Classifier;
use crate::config::SearchConfig;
use crate::errors::{unify_path, SearchError, SearchResult};
use crate::filters::{is_blocked_type, should_include_path};
use crate::results::{FileRecord, WalkOutput};

/// Enumerates every scannable file under `root`.
///
/// Hidden files and files matched by `.gitignore` are included: dumps are rarely
/// source trees. Files are returned sorted by path, each classified once; the
/// classification is reused for every search run over the same list.
///
/// Classification runs on a pool of `config.thread_count` workers. Both the walk
/// and the classification stop with [`SearchError::Interrupted`] once `cancel`
/// fires.
pub fn enumerate(
    root: &Path,
    config: &SearchConfig,
    classifier: &dyn Classifier,
    cancel: &CancellationToken,
) -> SearchResult<WalkOutput> {
    if !root.is_dir() {
        return Err(SearchError::not_found(root));
    }
    info!("Loading files from {}", root.display());

    let ignore = config.ignore_path.as_deref().map(unify_path);

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_path(|a, b| a.cmp(b));

    let mut skipped = 0;
    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in builder.build() {
        if cancel.is_cancelled() {
            return Err(SearchError::Interrupted);
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if should_include_path(entry.path(), ignore.as_deref(), &config.exclude_patterns) {
            candidates.push(entry.into_path());
        } else {
            debug!("Ignoring {}", entry.path().display());
        }
    }

    debug!("Classifying {} files", candidates.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.thread_count.get())
        .thread_name(|i| format!("leakscout-walk-{}", i))
        .build()?;
    let classified: Option<Vec<(PathBuf, std::io::Result<Option<String>>)>> = pool.install(|| {
        candidates
            .into_par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let mime = classifier.classify(&path);
                Some((path, mime))
            })
            .collect()
    });
    let Some(classified) = classified.filter(|_| !cancel.is_cancelled()) else {
        warn!("Walk interrupted");
        return Err(SearchError::Interrupted);
    };

    let mut output = WalkOutput {
        skipped,
        ..WalkOutput::default()
    };
    for (path, mime) in classified {
        let mime = match mime {
            Ok(mime) => mime,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                output.skipped += 1;
                continue;
            }
        };

        if is_blocked_type(mime.as_deref(), config) {
            trace!("Suppressed {} ({:?})", path.display(), mime);
            output.suppressed.extend(mime);
            continue;
        }

        if let Some(mime) = &mime {
            output.types.insert(mime.clone());
        }
        output.files.push(FileRecord {
            index: output.files.len(),
            path,
            mime,
        });
    }

    info!(
        "{} files found in {} ({} suppressed types, {} skipped)",
        output.files.len(),
        root.display(),
        output.suppressed.len(),
        output.skipped
    );
    Ok(output)
}
