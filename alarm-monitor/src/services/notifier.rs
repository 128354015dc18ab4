//! System notifications
//!
//! Surfaces a desktop notification alongside the in-process alarm.
//! Permission is requested lazily on first use; quiet hours suppress the
//! notification but never the alarm itself.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Daily window during which notifications stay silent.
///
/// A window whose `start` is after its `end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}

/// Desktop notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the platform for permission; `Ok(false)` means denied
    async fn request_permission(&self) -> Result<bool>;

    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn request_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::info!("Notification: {} - {}", title, body);
        Ok(())
    }
}

/// Runs an external program such as `notify-send` with title and body appended
#[derive(Debug)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::Config("Notifier command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn request_permission(&self) -> Result<bool> {
        match tokio::process::Command::new(&self.program)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Notifier '{}' unavailable: {}", self.program, e);
                Ok(false)
            }
        }
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(title)
            .arg(body)
            .status()
            .await?;

        if !status.success() {
            return Err(AppError::Generic(format!(
                "Notifier '{}' exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

/// Gatekeeper in front of a `Notifier`: lazy permission, quiet hours
pub struct AlarmNotifier {
    inner: Box<dyn Notifier>,
    permission: OnceCell<bool>,
}

impl AlarmNotifier {
    pub fn new(inner: Box<dyn Notifier>) -> Self {
        Self {
            inner,
            permission: OnceCell::new(),
        }
    }

    async fn permitted(&self) -> bool {
        *self
            .permission
            .get_or_init(|| async {
                match self.inner.request_permission().await {
                    Ok(granted) => {
                        tracing::info!("Notification permission granted: {}", granted);
                        granted
                    }
                    Err(e) => {
                        tracing::warn!("Notification permission request failed: {}", e);
                        false
                    }
                }
            })
            .await
    }

    /// Show a notification unless quiet hours cover `now`.
    /// Returns whether a notification was sent.
    pub async fn notify(
        &self,
        now: NaiveTime,
        quiet_hours: Option<&QuietHours>,
        title: &str,
        body: &str,
    ) -> bool {
        if quiet_hours.is_some_and(|q| q.contains(now)) {
            tracing::debug!("Notification suppressed by quiet hours");
            return false;
        }
        if !self.permitted().await {
            return false;
        }

        match self.inner.notify(title, body).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send notification: {}", e);
                false
            }
        }
    }
}
