//! Structured logging configuration.

use std::path::PathBuf;

/// Default filter directive when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "sqlaccess=info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Optional file to append log lines to instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds a logging configuration from `SQLACCESS_LOG`,
    /// `SQLACCESS_LOG_FORMAT` and `SQLACCESS_LOG_FILE`.
    ///
    /// `verbose` raises the default filter to debug; an explicit
    /// `SQLACCESS_LOG` still wins.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    fn from_lookup(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("SQLACCESS_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                if verbose {
                    "sqlaccess=debug".to_string()
                } else {
                    DEFAULT_LOG_FILTER.to_string()
                }
            });
        let format = lookup("SQLACCESS_LOG_FORMAT")
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or_default();
        let file = lookup("SQLACCESS_LOG_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            format,
            filter,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(false, lookup(&[]));
        assert_eq!(config, LoggingConfig::default());
    }

    #[test]
    fn test_verbose_raises_filter() {
        let config = LoggingConfig::from_lookup(true, lookup(&[]));
        assert_eq!(config.filter, "sqlaccess=debug");

        let config = LoggingConfig::from_lookup(true, lookup(&[("SQLACCESS_LOG", "warn")]));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_format_and_file() {
        let config = LoggingConfig::from_lookup(
            false,
            lookup(&[
                ("SQLACCESS_LOG_FORMAT", "JSON"),
                ("SQLACCESS_LOG_FILE", "/tmp/sqlaccess.log"),
            ]),
        );
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/sqlaccess.log")));
    }

    #[test]
    fn test_unknown_format_falls_back() {
        assert_eq!(LogFormat::parse("xml"), None);
        let config =
            LoggingConfig::from_lookup(false, lookup(&[("SQLACCESS_LOG_FORMAT", "xml")]));
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
