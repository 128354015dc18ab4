//! Services module
//!
//! Alarm pipeline services: the poller feeds the due-check engine, the
//! monitor runs both on timers, and the presenter and notifier surface
//! whatever the monitor raises.

pub mod due_check;
pub mod monitor;
pub mod notifier;
pub mod poller;
pub mod presenter;
pub mod settings;
pub mod snooze;

pub use due_check::DueCheckEngine;
pub use monitor::{AlarmEvent, AlarmMonitor, MonitorConfig, MonitorHandle};
pub use notifier::{AlarmNotifier, CommandNotifier, LogNotifier, Notifier, QuietHours};
pub use poller::ReminderPoller;
pub use presenter::AlarmPresenter;
pub use settings::{AppSettings, SettingsService};
pub use snooze::SnoozeLedger;
