//! Configuration loading for the command-line tool.

use anyhow::{Context, Result};
use rowkeep_common::config::Config;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let config =
        Config::load(path).with_context(|| format!("Failed to load config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./rowkeep.toml", "~/.config/rowkeep/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Apply command-line overrides on top of a loaded config.
pub fn apply_overrides(config: &mut Config, db: Option<PathBuf>, verbose: bool) {
    if let Some(db) = db {
        config.store.path = Some(db);
    }
    if verbose {
        config.store.debug_sql = true;
    }
}
