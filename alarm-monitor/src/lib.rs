//! Alarm monitor library
//!
//! This library exposes the reminder alarm pipeline for the binary and
//! for integration tests.

pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod services;
pub mod sound;
