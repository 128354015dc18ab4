//! Application configuration constants
//!
//! Central location for timing constants, resource limits,
//! and validation boundaries used throughout the monitor.

use std::time::Duration;

// ===== Monitor Cadence =====

/// How often the reminder list is refreshed from the backend
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// How often the in-memory reminder list is scanned for due reminders
pub const DUE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// A reminder is due when its fire time passed less than this long ago
pub const DUE_WINDOW: Duration = Duration::from_secs(60);

/// Snooze defers a reminder by this much from the moment of snoozing
pub const SNOOZE_DURATION: Duration = Duration::from_secs(5 * 60);

/// While an alarm is shown the presenter replays its sound at this period
pub const ALARM_SOUND_REPEAT: Duration = Duration::from_secs(3);

/// A player process still running after this long is killed
pub const PLAYER_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the alarm event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

// ===== Sound Limits =====

/// Maximum volume preference (percent)
pub const MAX_VOLUME_PERCENT: u8 = 100;

/// Default volume preference (percent)
pub const DEFAULT_VOLUME_PERCENT: u8 = 70;

/// Sample rate used when rendering tones to PCM
pub const SAMPLE_RATE_HZ: u32 = 44_100;

/// Valid sound identifiers for reminder alarms
pub const VALID_SOUND_IDS: &[&str] = &[
    "default", "chime", "bell", "ping", "pop", "ding", "alert", "gentle", "none",
];

// ===== API Limits =====

/// Minimum HTTP request timeout in seconds
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;

/// Maximum HTTP request timeout in seconds.
/// Must stay below the poll interval so one slow request cannot overlap the next.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 25;

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ===== Environment =====

/// Overrides the directory holding `settings.json`
pub const DATA_DIR_ENV: &str = "ALARM_MONITOR_DATA_DIR";

/// Overrides the stored API token
pub const TOKEN_ENV: &str = "ALARM_MONITOR_TOKEN";
