use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::SearchError;

/// MIME types excluded from scanning unless the configuration says otherwise.
///
/// Binary, executable, script and package formats that only add noise to a
/// credential search.
pub const DEFAULT_BLOCKED_TYPES: &[&str] = &[
    "application/x-sqlite3",
    "text/x-python",
    "application/vnd.debian.binary-package",
    "text/x-objective-c",
    "application/octet-stream",
    "application/zlib",
    "application/x-dosexec",
    "text/x-fortran",
    "image/x-portable-pixmap",
];

/// How source files are turned into text before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// One byte per character. Any byte sequence decodes, so heterogeneous or
    /// corrupted dumps never abort a scan.
    #[default]
    Latin1,
    /// Strict UTF-8. A line that is not valid UTF-8 aborts the scan of its file.
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Lossy,
}

impl EncodingMode {
    pub fn name(self) -> &'static str {
        match self {
            EncodingMode::Latin1 => "latin-1",
            EncodingMode::Utf8 => "utf-8",
            EncodingMode::Lossy => "utf-8 (lossy)",
        }
    }

    /// Encodes `text` the way a line of a source file would be stored on disk.
    ///
    /// Used for the separator token, which arrives as UTF-8 but has to be located
    /// inside raw artifact bytes.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, SearchError> {
        match self {
            EncodingMode::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        SearchError::config_error(format!(
                            "'{}' cannot be represented in latin-1",
                            text
                        ))
                    })
                })
                .collect(),
            EncodingMode::Utf8 | EncodingMode::Lossy => Ok(text.as_bytes().to_vec()),
        }
    }
}

impl FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(EncodingMode::Latin1),
            "utf8" | "utf-8" => Ok(EncodingMode::Utf8),
            "lossy" => Ok(EncodingMode::Lossy),
            other => Err(SearchError::config_error(format!(
                "Unknown encoding '{}', expected latin1, utf8 or lossy",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration shared by every search in a run.
///
/// # Configuration Locations
///
/// Loaded from the following locations, later ones taking precedence:
/// 1. Global `$CONFIG_DIR/leakscout/config.yaml`
/// 2. Local `.leakscout.yaml` in the current directory
/// 3. Custom config file given with `--config`
///
/// Command-line values are applied last through [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Worker threads (default: CPU cores)
/// thread_count: 8
///
/// # MIME types never scanned; replaces the default list
/// blocked_types:
///   - "application/octet-stream"
///   - "application/x-sqlite3"
///
/// # Paths to skip (glob syntax)
/// exclude_patterns:
///   - "**/*.bak"
///
/// # latin1 | utf8 | lossy
/// encoding_mode: latin1
///
/// # trace, debug, info, warn, error
/// log_level: "info"
///
/// # Parent of the per-run artifact directory
/// temp_dir: "/var/tmp"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// A single file excluded from the walk, typically a previous output
    #[serde(default)]
    pub ignore_path: Option<PathBuf>,

    /// Paths to skip (glob syntax)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// MIME types excluded from scanning
    #[serde(default = "default_blocked_types")]
    pub blocked_types: Vec<String>,

    /// Number of scan workers
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where scan artifacts are kept during a run; system temp dir if unset
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_blocked_types() -> Vec<String> {
    DEFAULT_BLOCKED_TYPES.iter().map(|t| t.to_string()).collect()
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ignore_path: None,
            exclude_patterns: Vec::new(),
            blocked_types: default_blocked_types(),
            thread_count: default_thread_count(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
            temp_dir: None,
        }
    }
}

/// Values given on the command line. `None` leaves the file value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ignore_path: Option<PathBuf>,
    pub exclude_patterns: Vec<String>,
    pub thread_count: Option<NonZeroUsize>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("leakscout/config.yaml")),
            Some(PathBuf::from(".leakscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if cli.ignore_path.is_some() {
            self.ignore_path = cli.ignore_path;
        }
        if !cli.exclude_patterns.is_empty() {
            self.exclude_patterns.extend(cli.exclude_patterns);
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// True if `mime` is on the block-list.
    pub fn is_blocked(&self, mime: &str) -> bool {
        self.blocked_types.iter().any(|t| t.eq_ignore_ascii_case(mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            blocked_types: ["application/pdf"]
            exclude_patterns: ["**/*.bak"]
            thread_count: 4
            encoding_mode: utf8
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.blocked_types, vec!["application/pdf"]);
        assert_eq!(config.exclude_patterns, vec!["**/*.bak".to_string()]);
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.encoding_mode, EncodingMode::Utf8);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"log_level: \"warn\"\n").unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.blocked_types.len(), DEFAULT_BLOCKED_TYPES.len());
        assert!(config.is_blocked("application/octet-stream"));
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(config.ignore_path, None);
        assert_eq!(config.encoding_mode, EncodingMode::Latin1);
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = SearchConfig {
            exclude_patterns: vec!["**/*.bak".to_string()],
            thread_count: NonZeroUsize::new(4).unwrap(),
            ..SearchConfig::default()
        };

        let merged = file_config.merge_with_cli(ConfigOverrides {
            ignore_path: Some(PathBuf::from("dumps/old.txt")),
            exclude_patterns: vec!["**/*.tmp".to_string()],
            thread_count: Some(NonZeroUsize::new(2).unwrap()),
            encoding_mode: None,
            log_level: Some("debug".to_string()),
        });

        assert_eq!(merged.ignore_path, Some(PathBuf::from("dumps/old.txt")));
        assert_eq!(merged.exclude_patterns, vec!["**/*.bak", "**/*.tmp"]);
        assert_eq!(merged.thread_count, NonZeroUsize::new(2).unwrap());
        assert_eq!(merged.encoding_mode, EncodingMode::Latin1);
        assert_eq!(merged.log_level, "debug");
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"thread_count: \"many\"\n").unwrap();

        assert!(SearchConfig::load_from(Some(&config_path)).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_encoding_mode_parsing() {
        assert_eq!("latin1".parse::<EncodingMode>().unwrap(), EncodingMode::Latin1);
        assert_eq!("UTF-8".parse::<EncodingMode>().unwrap(), EncodingMode::Utf8);
        assert_eq!("lossy".parse::<EncodingMode>().unwrap(), EncodingMode::Lossy);
        assert!("ebcdic".parse::<EncodingMode>().is_err());
    }

    #[test]
    fn test_encode_separator() {
        assert_eq!(EncodingMode::Latin1.encode(":").unwrap(), b":");
        assert_eq!(EncodingMode::Latin1.encode("§").unwrap(), vec![0xA7]);
        assert!(EncodingMode::Latin1.encode("€").is_err());
        assert_eq!(EncodingMode::Utf8.encode("§").unwrap(), "§".as_bytes());
    }
}
