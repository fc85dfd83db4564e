//! Configuration loading and root folder resolution

use crate::Result;
use std::path::{Path, PathBuf};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "shopmap.db";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SHOPMAP_ROOT_FOLDER";

/// Environment variable overriding the geocoding endpoint
pub const GEOCODER_URL_ENV: &str = "SHOPMAP_GEOCODER_URL";

/// Resolve the service root folder, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. SHOPMAP_ROOT_FOLDER environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Geocoding endpoint override from the environment, if any.
///
/// Empty values are ignored; the service falls back to its compiled default.
pub fn geocoder_url_override() -> Option<String> {
    std::env::var(GEOCODER_URL_ENV)
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Path of the database file inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder)?;
    Ok(())
}

/// Platform configuration file: `<config dir>/shopmap/config.toml`
fn config_file_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("shopmap").join("config.toml");
    path.exists().then_some(path)
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("shopmap"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/shopmap"))
}
