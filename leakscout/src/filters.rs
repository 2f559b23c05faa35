/// File filtering applied during the walk.
///
/// Three independent rules decide whether a walked file is scanned:
///
/// 1. **Ignore path**: one nominated file (usually the output of a previous run)
///    compared by canonical path, so `./dump/../dump/a.txt` and `dump/a.txt` are the
///    same file.
/// 2. **Exclude patterns**: glob patterns matched against the full path, e.g.
///    `**/*.bak`.
/// 3. **Block-list**: MIME types from the configuration. This rule needs the
///    classifier and is applied by the walker after the path rules.
///
/// Free functions keep the rules usable from both the walker and tests without
/// building a configuration.
use glob::Pattern;
use std::path::Path;

use crate::config::SearchConfig;
use crate::errors::unify_path;

/// Checks if a file should be ignored based on exclude patterns
pub fn should_exclude(path: &Path, exclude_patterns: &[String]) -> bool {
    let normalized_path = path.to_string_lossy().replace('\\', "/");

    exclude_patterns.iter().any(|pattern| {
        if let Ok(p) = Pattern::new(pattern) {
            p.matches(&normalized_path)
        } else {
            false
        }
    })
}

/// Checks if `path` is the nominated ignore path. `ignore` must already be unified.
pub fn is_ignore_path(path: &Path, ignore: Option<&Path>) -> bool {
    match ignore {
        None => false,
        Some(ignore) => unify_path(path) == ignore,
    }
}

/// Checks if a classified type is on the block-list. Unclassified files pass.
pub fn is_blocked_type(mime: Option<&str>, config: &SearchConfig) -> bool {
    mime.is_some_and(|m| config.is_blocked(m))
}

/// Path rules only; the block-list is checked once the file has been classified.
pub fn should_include_path(path: &Path, ignore: Option<&Path>, exclude_patterns: &[String]) -> bool {
    !is_ignore_path(path, ignore) && !should_exclude(path, exclude_patterns)
}
