//! Configuration management.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default database file name.
pub const DEFAULT_DATABASE_NAME: &str = "SQLite.db";

/// Default busy timeout applied to the connection, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Main configuration for sqlaccess.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Writable directory holding the live database file.
    pub data_dir: PathBuf,
    /// Directory holding the bundled template database, if any.
    pub seed_dir: Option<PathBuf>,
    /// Database file name, shared by the live file and its template.
    pub database_name: String,
    /// Whether the engine may create the file when it is absent.
    pub create_if_missing: bool,
    /// Default rollback preference for transaction batches.
    pub rollback_on_error: bool,
    /// Foreign key enforcement applied on open (`None` leaves the engine default).
    pub foreign_keys: Option<bool>,
    /// Busy timeout applied on open.
    pub busy_timeout_ms: u32,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Seed directory.
    pub seed_dir: Option<String>,
    /// Database file name.
    pub database_name: Option<String>,
    /// Create the database file if missing.
    pub create_if_missing: Option<bool>,
    /// Rollback preference.
    pub rollback_on_error: Option<bool>,
    /// Foreign key enforcement.
    pub foreign_keys: Option<bool>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seed_dir: None,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            create_if_missing: false,
            rollback_on_error: false,
            foreign_keys: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl AccessConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| crate::Error::Config {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| crate::Error::Config {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        let mut config = Self::from_config_file(file);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`{config_dir}/sqlaccess/config.toml`),
    /// then applies `SQLACCESS_*` environment overrides. Returns defaults if
    /// no config file is found or it cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("sqlaccess").join("config.toml"))
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Ignoring unreadable config file");
                    None
                },
            })
            .unwrap_or_default();

        config.apply_env_overrides();
        config
    }

    /// Converts a `ConfigFile` to `AccessConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(seed_dir) = file.seed_dir {
            config.seed_dir = Some(PathBuf::from(seed_dir));
        }
        if let Some(name) = file.database_name {
            config.database_name = name;
        }
        if let Some(v) = file.create_if_missing {
            config.create_if_missing = v;
        }
        if let Some(v) = file.rollback_on_error {
            config.rollback_on_error = v;
        }
        if let Some(v) = file.busy_timeout_ms {
            config.busy_timeout_ms = v;
        }
        config.foreign_keys = file.foreign_keys;

        config
    }

    /// Applies `SQLACCESS_DATA_DIR`, `SQLACCESS_SEED_DIR` and `SQLACCESS_DB_NAME`.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SQLACCESS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SQLACCESS_SEED_DIR") {
            self.seed_dir = Some(PathBuf::from(dir));
        }
        if let Ok(name) = std::env::var("SQLACCESS_DB_NAME") {
            self.database_name = name;
        }
    }

    /// Returns the path of the live database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the seed directory.
    #[must_use]
    pub fn with_seed_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_dir = Some(path.into());
        self
    }

    /// Sets the database file name.
    #[must_use]
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Allows the engine to create a missing database file.
    #[must_use]
    pub const fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets the default rollback preference.
    #[must_use]
    pub const fn with_rollback_on_error(mut self, rollback: bool) -> Self {
        self.rollback_on_error = rollback;
        self
    }
}

/// Resolves the platform data directory, falling back to the temp dir.
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || std::env::temp_dir().join("sqlaccess"),
        |dirs| dirs.data_dir().join("sqlaccess"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.database_name, DEFAULT_DATABASE_NAME);
        assert!(!config.create_if_missing);
        assert!(!config.rollback_on_error);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert!(config.database_path().ends_with(DEFAULT_DATABASE_NAME));
    }

    #[test]
    fn test_from_config_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            data_dir = "/tmp/data"
            seed_dir = "/opt/app/resources"
            database_name = "app.db"
            rollback_on_error = true
            foreign_keys = true
            busy_timeout_ms = 250
            "#,
        )
        .unwrap();
        let config = AccessConfig::from_config_file(file);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.seed_dir, Some(PathBuf::from("/opt/app/resources")));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/data/app.db"));
        assert!(config.rollback_on_error);
        assert_eq!(config.foreign_keys, Some(true));
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = AccessConfig::load_from_file(Path::new("/nonexistent/sqlaccess.toml"));
        assert!(matches!(
            result,
            Err(crate::Error::Config { ref operation, .. }) if operation == "read_config_file"
        ));
    }

    #[test]
    fn test_builders() {
        let config = AccessConfig::new()
            .with_data_dir("/d")
            .with_seed_dir("/s")
            .with_database_name("x.db")
            .with_create_if_missing(true)
            .with_rollback_on_error(true);
        assert_eq!(config.database_path(), PathBuf::from("/d/x.db"));
        assert_eq!(config.seed_dir, Some(PathBuf::from("/s")));
        assert!(config.create_if_missing);
        assert!(config.rollback_on_error);
    }
}
