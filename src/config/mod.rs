// ABOUTME: Installation settings loaded from an optional TOML file under the user's config directory

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const REGISTRY_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine the home directory")]
    NoHome,
    #[error("failed to read settings from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// User settings, every field optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry document location
    pub registry_path: PathBuf,
    /// Where projects and modules are created
    pub dev_root: PathBuf,
    pub language: String,
    pub container_runtime: String,
    pub timezone: String,
    /// Scaffold repositories are `<scaffold_base_url>/<repo>.git`
    pub scaffold_base_url: String,
    pub proxy_network: String,
    pub infra_network: String,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            registry_path: config_dir(&home).join(REGISTRY_FILE),
            dev_root: home.join("dev"),
            language: "en".to_string(),
            container_runtime: "docker".to_string(),
            timezone: std::env::var("TZ")
                .ok()
                .filter(|tz| !tz.is_empty())
                .unwrap_or_else(|| "UTC".to_string()),
            scaffold_base_url: "https://github.com/takashiraki".to_string(),
            proxy_network: "my_proxy_network".to_string(),
            infra_network: "my_infra_network".to_string(),
        }
    }
}

fn config_dir(home: &Path) -> PathBuf {
    home.join(".config").join("envbox")
}

/// `~/.config/envbox/settings.toml`
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    let home = dirs::home_dir().ok_or(SettingsError::NoHome)?;
    Ok(config_dir(&home).join(SETTINGS_FILE))
}

impl Settings {
    /// Load from the default location, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from_path(&default_settings_path()?)
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply the `--registry` override, if any.
    pub fn with_registry_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.registry_path = path;
        }
        self
    }

    /// Clone URL of a scaffold repository under the configured base.
    pub fn scaffold_url(&self, repo: &str) -> String {
        format!("{}/{}.git", self.scaffold_base_url.trim_end_matches('/'), repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.proxy_network, "my_proxy_network");
        assert!(settings.registry_path.ends_with(".config/envbox/config.json"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "dev_root = \"/work\"\ntimezone = \"Asia/Tokyo\"\n").unwrap();

        let settings = Settings::load_from_path(&path).unwrap();

        assert_eq!(settings.dev_root, PathBuf::from("/work"));
        assert_eq!(settings.timezone, "Asia/Tokyo");
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "dev_root = [").unwrap();

        assert!(matches!(
            Settings::load_from_path(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_scaffold_url_joins_repo_name() {
        let settings = Settings {
            scaffold_base_url: "https://example.com/org/".to_string(),
            ..Settings::default()
        };

        assert_eq!(settings.scaffold_url("docker_php"), "https://example.com/org/docker_php.git");
    }

    #[test]
    fn test_registry_override() {
        let settings = Settings::default().with_registry_path(Some(PathBuf::from("/tmp/r.json")));
        assert_eq!(settings.registry_path, PathBuf::from("/tmp/r.json"));
    }
}
