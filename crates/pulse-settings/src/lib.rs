//! # pulse-settings
//!
//! Configuration for the Pulse notification channel.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PulseSettings::default()`]
//! 2. **User file**: `~/.pulse/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PULSE_*` overrides (highest priority)
//!
//! There is no process-wide singleton: callers load once and hand the value
//! to the client they construct.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_settings_with,
    settings_path,
};
pub use types::*;
