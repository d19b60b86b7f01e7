//! Path resolution for k3node
//!
//! # Environment Variables
//!
//! - `K3NODE_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/k3node`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `K3NODE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/k3node` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\k3node`
//!    - macOS/Linux: `~/.config/k3node`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "K3NODE_CONFIG_DIR";

/// Name of the node configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "node.toml";

/// Get the k3node config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("k3node");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("k3node");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("k3node");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// The default node configuration file, if it exists
pub fn default_config_file() -> Result<Option<PathBuf>> {
    let path = config_dir()?.join(CONFIG_FILE_NAME);
    if path.is_file() {
        log::debug!("Found default config file: {}", path.display());
        Ok(Some(path))
    } else {
        Ok(None)
    }
}

/// Expand `~` and environment variables in a path
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
