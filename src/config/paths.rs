//! Where `settings.toml` lives, resolved with the `dirs` crate.
//!
//!   Windows: %APPDATA%\artwork-audio\settings.toml
//!   macOS:   ~/Library/Application Support/artwork-audio/settings.toml
//!   Linux:   ~/.config/artwork-audio/settings.toml

use std::path::{Path, PathBuf};

const APP_NAME: &str = "artwork-audio";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// The platform config directory, or `./artwork-audio` when the
    /// platform has none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(base.join(APP_NAME))
    }

    /// Paths rooted at an explicit directory.
    pub fn in_dir(config_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_dir_is_namespaced() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with(APP_NAME));
        assert_eq!(paths.settings_file.parent(), Some(paths.config_dir.as_path()));
    }

    #[test]
    fn explicit_dir() {
        let paths = AppPaths::in_dir("/tmp/aa");
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/aa/settings.toml"));
    }
}
