use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "GUIDE_CONFIG";

/// Configuration for a single weather provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Firebase project holding the guide documents and user accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub project_id: String,
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional weather provider id, e.g. "open-meteo" or "openweather".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// [backend]
    /// project_id = "..."
    /// api_key = "..."
    pub backend: Option<BackendConfig>,
}

impl Config {
    /// The configured weather provider; Open-Meteo when nothing is set since it needs no key.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn backend(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().ok_or_else(|| {
            anyhow!(
                "No backend configured.\n\
                 Hint: run `guide configure-backend` and enter the Firebase project id and API key."
            )
        })
    }

    pub fn set_backend(&mut self, project_id: String, api_key: String) {
        self.backend = Some(BackendConfig { project_id, api_key });
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Path to the config file; `GUIDE_CONFIG` takes precedence.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the last signed-in user is cached.
    pub fn session_cache_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("cached_user.json"))
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "travel-guide", "guide-cli")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn default_provider_id_is_open_meteo_when_not_set() {
        let cfg = Config::default();
        assert_eq!(cfg.default_provider_id().expect("keyless default"), ProviderId::OpenMeteo);
    }

    #[test]
    fn default_provider_id_rejects_unknown_ids() {
        let cfg = Config { default_provider: Some("darksky".into()), ..Config::default() };
        let err = cfg.default_provider_id().unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenWeather);

        let key = cfg.provider_api_key(ProviderId::OpenWeather);
        assert_eq!(key, Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn upsert_does_not_override_existing_default() {
        let mut cfg = Config::default();
        cfg.set_default_provider(ProviderId::OpenMeteo);

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        assert_eq!(cfg.default_provider_id().expect("set"), ProviderId::OpenMeteo);
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn open_meteo_is_always_configured() {
        let cfg = Config::default();
        assert!(cfg.is_provider_configured(ProviderId::OpenMeteo));
        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn backend_errors_with_hint_when_missing() {
        let err = Config::default().backend().unwrap_err();
        assert!(err.to_string().contains("guide configure-backend"));
    }

    #[test]
    fn save_and_load_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());
        cfg.set_backend("travel-guide".into(), "FIREBASE_KEY".into());
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.default_provider_id().expect("set"), ProviderId::OpenWeather);
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeather), Some("OPEN_KEY"));
        assert_eq!(loaded.backend().expect("set").project_id, "travel-guide");
    }

    #[test]
    fn load_missing_file_gives_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("load");
        assert!(cfg.default_provider.is_none());
        assert!(cfg.backend.is_none());
    }
}
