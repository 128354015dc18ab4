//! Backend resource models
//!
//! Rust structs mirroring the JSON the finance backend returns.
//! Only the fields the alarm path needs are modeled; anything else in the
//! payload is ignored.

use crate::error::{AppError, Result};
use crate::services::notifier::QuietHours;
use crate::sound::SoundId;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque reminder identity.
///
/// The backend serializes ids as JSON numbers; string ids are accepted too
/// and both compare by their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl ReminderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReminderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ReminderId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ReminderId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => ReminderId(n.to_string()),
            RawId::Text(s) => ReminderId(s),
        })
    }
}

/// Calendar event a reminder is attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

/// A reminder as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub message: String,
    /// Local wall time at which the reminder fires
    #[serde(deserialize_with = "deserialize_local_naive")]
    pub reminder_time: NaiveDateTime,
    #[serde(default)]
    pub event: Option<EventRef>,
    #[serde(default)]
    pub account_id: Option<i64>,
    /// Server-side delivery flag. Not used for client suppression.
    #[serde(default)]
    pub sent: bool,
}

/// Create reminder request
#[derive(Debug, Clone, Serialize)]
pub struct CreateReminderRequest {
    pub message: String,
    #[serde(with = "local_naive_format")]
    pub reminder_time: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
}

/// Which reminders the monitor watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderScope {
    Global,
    Account(i64),
}

impl ReminderScope {
    pub fn from_account(account_id: Option<i64>) -> Self {
        match account_id {
            Some(id) => ReminderScope::Account(id),
            None => ReminderScope::Global,
        }
    }
}

/// User notification preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Whether alarms play a sound
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub sound: SoundId,
    /// Alarm volume, 0-100
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Whether a system notification accompanies the in-process alarm
    #[serde(default = "default_true")]
    pub desktop_enabled: bool,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

fn default_true() -> bool {
    true
}

fn default_volume() -> u8 {
    crate::config::DEFAULT_VOLUME_PERCENT
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound: SoundId::default(),
            volume: default_volume(),
            desktop_enabled: true,
            quiet_hours: None,
        }
    }
}

/// Parse a backend timestamp into local wall time.
///
/// The backend sends local-naive ISO 8601 (`2024-03-01T09:30:00`, optionally
/// with fractional seconds). Offset-bearing RFC 3339 strings are converted
/// to the local zone.
pub fn parse_local_naive(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Ok(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Ok(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local).naive_local())
        .map_err(|e| AppError::InvalidTimestamp(format!("{}: {}", raw, e)))
}

fn deserialize_local_naive<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_local_naive(&raw).map_err(serde::de::Error::custom)
}

mod local_naive_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}
