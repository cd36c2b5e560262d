//! Store configuration.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section
//! defaults sensibly so an empty file is valid and yields an in-memory store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(Error::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.store.path.is_none() {
            warnings.push("store.path is not set; data lives in memory only".into());
        }
        if self.store.busy_timeout_ms == 0 {
            warnings.push(
                "store.busy_timeout_ms is 0; concurrent writers fail immediately".into(),
            );
        }
        if self.store.id_column.trim().is_empty() {
            warnings.push("store.id_column is empty; falling back to \"id\"".into());
        }

        warnings
    }
}

/// Settings for opening the embedded store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` selects a private in-memory database.
    pub path: Option<PathBuf>,
    /// Emit every composed statement as a debug event.
    pub debug_sql: bool,
    /// How long a handle waits on a lock held by another connection.
    pub busy_timeout_ms: u64,
    /// Name of the integer identity column shared by managed tables.
    pub id_column: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            debug_sql: false,
            busy_timeout_ms: 5_000,
            id_column: DEFAULT_ID_COLUMN.to_string(),
        }
    }
}

impl StoreConfig {
    /// A file-backed store at `path` with default settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// An in-memory store with default settings.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Builder-style toggle for SQL debug logging.
    pub fn with_debug_sql(mut self, enabled: bool) -> Self {
        self.debug_sql = enabled;
        self
    }

    /// The identity column, or [`DEFAULT_ID_COLUMN`] when blank.
    pub fn id_column(&self) -> &str {
        let trimmed = self.id_column.trim();
        if trimmed.is_empty() {
            DEFAULT_ID_COLUMN
        } else {
            trimmed
        }
    }
}

/// Identity column name used when none is configured.
pub const DEFAULT_ID_COLUMN: &str = "id";
