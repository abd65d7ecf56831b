use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::{ColumnIdError, TaskboardConfig};

/// Config file name at the vault root
pub const CONFIG_FILE: &str = "taskboard.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {CONFIG_FILE} found in this directory or any parent")]
    NotAVault,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {CONFIG_FILE}: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid column: {0}")]
    InvalidColumn(#[from] ColumnIdError),
}

/// Find the vault root by walking up from `start` until a directory holding
/// `taskboard.toml` turns up.
pub fn discover_vault(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAVault);
        }
    }
}

/// Load and validate the vault's config. A vault without a config file
/// gets the defaults.
pub fn load_config(root: &Path) -> Result<TaskboardConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "no config file, using defaults");
            return Ok(TaskboardConfig::default());
        }
        Err(source) => return Err(ConfigError::ReadError { path, source }),
    };
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<TaskboardConfig, ConfigError> {
    let config: TaskboardConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Vault root and config for a working directory. Without a config file
/// anywhere above `start`, `start` itself is the vault.
pub fn open_vault(start: &Path) -> Result<(PathBuf, TaskboardConfig), ConfigError> {
    let root = match discover_vault(start) {
        Ok(root) => root,
        Err(ConfigError::NotAVault) => start.to_path_buf(),
        Err(e) => return Err(e),
    };
    let config = load_config(&root)?;
    Ok((root, config))
}
