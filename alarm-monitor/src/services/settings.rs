//! Settings service
//!
//! Manages monitor settings persistence using JSON file storage.

use crate::api::NotificationPreferences;
use crate::config::{
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS, MAX_VOLUME_PERCENT,
    MIN_REQUEST_TIMEOUT_SECS,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; `ALARM_MONITOR_TOKEN` takes precedence
    #[serde(default)]
    pub token: Option<String>,
    /// Watch a single account instead of all reminders
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            account_id: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Local output devices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Command that plays a WAV from stdin, e.g. "aplay -q"; silent if unset
    #[serde(default)]
    pub audio_player: Option<String>,
    /// Command receiving title and body arguments, e.g. "notify-send";
    /// notifications go to the log if unset
    #[serde(default)]
    pub notifier: Option<String>,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub output: OutputSettings,
}

impl AppSettings {
    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url must not be empty".to_string()));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }

        let timeout = self.api.request_timeout_secs;
        if !(MIN_REQUEST_TIMEOUT_SECS..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout) {
            return Err(AppError::Config(format!(
                "api.request_timeout_secs must be between {} and {}",
                MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if self.notifications.volume > MAX_VOLUME_PERCENT {
            return Err(AppError::Config(format!(
                "notifications.volume must be at most {}",
                MAX_VOLUME_PERCENT
            )));
        }

        Ok(())
    }
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        settings.validate()?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Get notification preferences
    pub async fn get_notifications(&self) -> Result<NotificationPreferences> {
        let settings = self.load().await?;
        Ok(settings.notifications)
    }

    /// Update notification preferences
    pub async fn update_notifications(&self, notifications: NotificationPreferences) -> Result<()> {
        let mut settings = self.load().await?;
        settings.notifications = notifications;
        self.save(&settings).await?;
        Ok(())
    }
}
