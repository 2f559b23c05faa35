use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

const SIMPLE_PATTERN_THRESHOLD: usize = 32;

/// Characters allowed between the two names of an address' local part
const LOCAL_PART_FILLER: &str = r"[^@\s]*";

static PATTERN_CACHE: Lazy<DashMap<String, MatchStrategy>> = Lazy::new(DashMap::new);

/// Builds the effective pattern for a search.
///
/// With both names present the raw pattern is ignored and the result matches an
/// address whose local part holds the first name then the last name, or the last
/// name then the first, with anything but `@` or whitespace around and between
/// them, directly followed by `@`.
pub fn build_pattern(raw: &str, firstname: Option<&str>, lastname: Option<&str>) -> String {
    match (firstname, lastname) {
        (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
            let (first, last) = (regex::escape(first), regex::escape(last));
            let f = LOCAL_PART_FILLER;
            format!("(?:{first}{f}{last}{f}@|{last}{f}{first}{f}@)")
        }
        _ => raw.to_string(),
    }
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    Simple(String),
    Regex(Arc<Regex>),
}

/// Tests lines for the effective pattern
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    strategy: MatchStrategy,
    /// Whether the pattern may depend on the line break after a line
    sees_terminator: bool,
}

impl PatternMatcher {
    /// Compiles `pattern`, reusing an earlier compilation when one exists
    pub fn new(pattern: &str) -> SearchResult<Self> {
        Self::compile(pattern, true)
    }

    /// Builds the effective pattern from names or `raw` and compiles it.
    ///
    /// Name patterns are compiled once per person and never shared, so they skip
    /// the cache.
    pub fn for_names(raw: &str, firstname: Option<&str>, lastname: Option<&str>) -> SearchResult<Self> {
        let pattern = build_pattern(raw, firstname, lastname);
        if pattern == raw {
            return Self::new(raw);
        }
        let mut matcher = Self::compile(&pattern, false)?;
        // The filler stops at whitespace, so a line break never takes part
        matcher.sees_terminator = false;
        Ok(matcher)
    }

    fn compile(pattern: &str, cached: bool) -> SearchResult<Self> {
        if pattern.is_empty() {
            return Err(SearchError::invalid_pattern("pattern is empty"));
        }

        let strategy = match PATTERN_CACHE.get(pattern) {
            Some(entry) => entry.clone(),
            None => {
                let strategy = if Self::is_simple_pattern(pattern) {
                    MatchStrategy::Simple(pattern.to_string())
                } else {
                    MatchStrategy::Regex(Arc::new(
                        Regex::new(pattern)
                            .map_err(|e| SearchError::invalid_pattern(e.to_string()))?,
                    ))
                };
                if cached {
                    PATTERN_CACHE.insert(pattern.to_string(), strategy.clone());
                }
                strategy
            }
        };

        debug!(
            "Pattern '{}' uses {} matching",
            pattern,
            match strategy {
                MatchStrategy::Simple(_) => "literal",
                MatchStrategy::Regex(_) => "regex",
            }
        );
        Ok(Self {
            pattern: pattern.to_string(),
            sees_terminator: matches!(strategy, MatchStrategy::Regex(_)),
            strategy,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Determines if a pattern can use simple string matching
    fn is_simple_pattern(pattern: &str) -> bool {
        pattern.len() < SIMPLE_PATTERN_THRESHOLD
            && !pattern.contains(|c: char| c.is_ascii_punctuation() && c != '_' && c != '-' && c != '@')
    }

    /// True if the pattern occurs anywhere in `line`
    pub fn is_match(&self, line: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Simple(literal) => line.contains(literal.as_str()),
            MatchStrategy::Regex(regex) => regex.is_match(line),
        }
    }

    /// Like [`is_match`](Self::is_match) for a line that ended in a line break.
    ///
    /// `line` comes without its terminator. Regex patterns that miss it are tried
    /// once more against `line` followed by a single `\n`, so `foo\s` matches a
    /// line ending in `foo` while `foo$` still matches as well. `buf` is reused
    /// between calls.
    pub fn is_match_terminated(&self, line: &str, buf: &mut String) -> bool {
        if self.is_match(line) {
            return true;
        }
        match &self.strategy {
            MatchStrategy::Regex(regex) if self.sees_terminator => {
                buf.clear();
                buf.push_str(line);
                buf.push('\n');
                regex.is_match(buf)
            }
            _ => false,
        }
    }
}
