//! Default paths for oarlog components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/oarlog/config.toml` or `~/.config/oarlog/config.toml`
//! - Data: `$XDG_DATA_HOME/oarlog` or `~/.local/share/oarlog`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const OARLOG_CONFIG_ENV: &str = "OARLOG_CONFIG";

/// Environment variable for overriding the data directory
pub const OARLOG_DATA_DIR_ENV: &str = "OARLOG_DATA_DIR";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "oarlog.db";

const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "oarlog";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$OARLOG_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/oarlog/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/oarlog/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(OARLOG_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_dir_without_env().join(CONFIG_FILENAME)
}

fn config_dir_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("config")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$OARLOG_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/oarlog` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/oarlog` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(OARLOG_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking OARLOG_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_oarlog() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("oarlog"));
    }

    #[test]
    fn config_dir_contains_oarlog() {
        let path = config_dir_without_env().join(CONFIG_FILENAME);
        assert!(path.to_string_lossy().contains("oarlog"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
