//! Backend API module
//!
//! - Wire models for reminders and notification preferences
//! - REST client and the `ReminderSource` seam used by the poller

pub mod client;
pub mod models;

pub use client::{ApiClient, ReminderSource};
pub use models::*;
