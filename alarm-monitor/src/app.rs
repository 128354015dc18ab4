//! Application state and initialization
//!
//! This module wires settings, the backend client, and the sound engine
//! together and starts the alarm pipeline.

use crate::api::{
    ApiClient, CreateReminderRequest, NotificationPreferences, Reminder, ReminderId, ReminderScope,
};
use crate::clock::SystemClock;
use crate::config::{DATA_DIR_ENV, TOKEN_ENV};
use crate::error::{AppError, Result};
use crate::services::{
    AlarmMonitor, AlarmNotifier, AlarmPresenter, AppSettings, CommandNotifier, LogNotifier,
    MonitorHandle, Notifier, ReminderPoller, SettingsService,
};
use crate::sound::SoundEngine;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Directory holding `settings.json`
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("alarm-monitor"))
        .ok_or_else(|| AppError::Generic("Failed to resolve config directory".to_string()))
}

/// Central application state holding all services
pub struct AppState {
    pub settings_service: SettingsService,
    pub settings: AppSettings,
    pub api: ApiClient,
    pub sound: Arc<SoundEngine>,
}

/// A running alarm pipeline
pub struct RunningMonitor {
    pub monitor: MonitorHandle,
    pub presenter: JoinHandle<()>,
}

impl AppState {
    /// Load settings and build services - called once on startup
    pub async fn initialize(data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing alarm monitor");
        tracing::info!("Data directory: {:?}", data_dir);

        tokio::fs::create_dir_all(&data_dir).await?;

        let settings_service = SettingsService::new(data_dir);
        let mut settings = settings_service.load().await?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            settings.api.token = Some(token);
        }

        let api = ApiClient::new(
            &settings.api.base_url,
            settings.api.token.clone(),
            Duration::from_secs(settings.api.request_timeout_secs),
        )?;

        let sound = Arc::new(SoundEngine::with_player(settings.output.audio_player.clone()));

        tracing::info!("Alarm monitor initialized against {}", api.base_url());

        Ok(Self {
            settings_service,
            settings,
            api,
            sound,
        })
    }

    pub fn scope(&self) -> ReminderScope {
        ReminderScope::from_account(self.settings.api.account_id)
    }

    /// Backend preferences, falling back to the local settings file
    pub async fn resolve_preferences(&self) -> NotificationPreferences {
        match self.api.fetch_notification_preferences().await {
            Ok(prefs) => {
                tracing::info!("Using notification preferences from backend");
                prefs
            }
            Err(e) => {
                tracing::warn!("Failed to fetch notification preferences, using local settings: {}", e);
                self.settings.notifications.clone()
            }
        }
    }

    fn build_notifier(&self) -> Result<AlarmNotifier> {
        let inner: Box<dyn Notifier> = match self.settings.output.notifier.as_deref() {
            Some(cmd) if !cmd.trim().is_empty() => Box::new(CommandNotifier::from_command_line(cmd)?),
            _ => Box::new(LogNotifier),
        };
        Ok(AlarmNotifier::new(inner))
    }

    /// Start polling, due checks, and alarm ringing
    pub async fn start_monitor(&self) -> Result<RunningMonitor> {
        let preferences = self.resolve_preferences().await;

        let poller = ReminderPoller::new(Arc::new(self.api.clone()), self.scope());
        let notifier = self.build_notifier()?;

        let monitor =
            AlarmMonitor::start(poller, Arc::new(SystemClock), Some(notifier), preferences)
                .await
                .with_sound(Arc::clone(&self.sound))
                .await;
        let presenter = AlarmPresenter::new(Arc::clone(&self.sound)).spawn(monitor.subscribe());

        Ok(RunningMonitor { monitor, presenter })
    }

    /// Apply new preferences to the running monitor and keep them locally
    pub async fn update_preferences(
        &self,
        monitor: &MonitorHandle,
        preferences: NotificationPreferences,
    ) -> Result<()> {
        self.settings_service
            .update_notifications(preferences.clone())
            .await?;
        monitor.set_preferences(preferences).await;
        Ok(())
    }

    /// Schedule a reminder `minutes` from now and pick it up immediately
    pub async fn add_reminder(
        &self,
        monitor: &MonitorHandle,
        minutes: i64,
        message: &str,
    ) -> Result<Reminder> {
        let request = CreateReminderRequest {
            message: message.to_string(),
            reminder_time: Local::now().naive_local() + chrono::Duration::minutes(minutes),
            account_id: self.settings.api.account_id,
            event_id: None,
        };
        let created = self.api.create_reminder(&request).await?;
        monitor.refresh_now().await;
        Ok(created)
    }

    pub async fn delete_reminder(&self, monitor: &MonitorHandle, id: &ReminderId) -> Result<()> {
        self.api.delete_reminder(id).await?;
        monitor.refresh_now().await;
        Ok(())
    }
}
