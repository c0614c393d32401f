use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted client state. Maps 1:1 onto the keys the app stores between
/// launches: credentials, device identity, and playback preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "generate_device_id")]
    pub device_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_playback_mode")]
    pub playback_mode: String,
    #[serde(default)]
    pub auto_cache: bool,
    #[serde(default = "default_true")]
    pub background_playback: bool,
    #[serde(default = "default_true")]
    pub lock_screen_control: bool,
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn generate_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_language() -> String {
    "zh-Hans".to_string()
}

fn default_playback_mode() -> String {
    "singleLoop".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            device_id: generate_device_id(),
            language: default_language(),
            playback_mode: default_playback_mode(),
            auto_cache: false,
            background_playback: true,
            lock_screen_control: true,
            path: None,
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".qingyu"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Loads from the default location, falling back to defaults when the
    /// file does not exist yet (first launch).
    pub fn load() -> AppResult<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let mut config = Self::default();
            config.path = Some(path.to_path_buf());
            return Ok(config);
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Writes back to wherever the config was loaded from.
    pub fn save(&self) -> AppResult<()> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => Self::config_path()?,
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

/// Constructor input for [`crate::api::ApiClient`]. Everything the client
/// needs is passed in here; nothing is read from ambient globals.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_version: String,
    pub language: String,
    pub device: DeviceInfo,
}

impl ClientConfig {
    pub fn new(device: DeviceInfo, language: impl Into<String>) -> Self {
        let base_url = if cfg!(debug_assertions) {
            "http://localhost:3000".to_string()
        } else {
            "https://api.qingyu.app".to_string()
        };
        Self {
            base_url,
            api_version: "/api/v1".to_string(),
            language: language.into(),
            device,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full prefix for endpoint paths.
    pub fn api_root(&self) -> String {
        format!("{}{}", self.base_url, self.api_version)
    }
}

/// Identifies this installation to the server; sent on every request as
/// `X-Device-*` headers.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_id: String,
    pub device_model: String,
    pub os_version: String,
    pub app_version: String,
}

impl DeviceInfo {
    pub fn detect(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_model: std::env::consts::ARCH.to_string(),
            os_version: std::env::consts::OS.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
