//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PulseSettings::default()`]
//! 2. If `~/.pulse/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `PULSE_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::PulseSettings;

/// Resolve the path to the settings file (`~/.pulse/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".pulse").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PulseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid value is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<PulseSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `lookup`.
pub fn load_settings_with<F>(path: &Path, lookup: F) -> Result<PulseSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(PulseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PulseSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut PulseSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Integers must parse and fall within range; anything else is logged and
/// ignored, leaving the file/default value in place.
pub fn apply_overrides<F>(settings: &mut PulseSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Channel ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PULSE_API_BASE_URL") {
        settings.channel.api_base_url = v;
    }
    if let Some(v) = env.string("PULSE_PAGE_ORIGIN") {
        settings.channel.page_origin = Some(v);
    }
    if let Some(v) = env.u64("PULSE_CONNECT_TIMEOUT_MS", 100, 600_000) {
        settings.channel.connect_timeout_ms = v;
    }

    // ── Reconnect ───────────────────────────────────────────────────
    if let Some(v) = env.u32("PULSE_MAX_RETRIES", 0, 100) {
        settings.reconnect.max_retries = v;
    }
    if let Some(v) = env.u64("PULSE_RECONNECT_BASE_DELAY_MS", 1, 600_000) {
        settings.reconnect.base_delay_ms = v;
    }

    // ── Liveness ────────────────────────────────────────────────────
    if let Some(v) = env.u64("PULSE_KEEPALIVE_INTERVAL_MS", 1000, 3_600_000) {
        settings.liveness.keepalive_interval_ms = v;
    }
    if let Some(v) = env.u64("PULSE_IDLE_CHECK_INTERVAL_MS", 100, 3_600_000) {
        settings.liveness.idle_check_interval_ms = v;
    }
    if let Some(v) = env.u64("PULSE_IDLE_TIMEOUT_MS", 1000, 86_400_000) {
        settings.liveness.idle_timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PULSE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("PULSE_LOG_FORMAT") {
        match serde_json::from_value(Value::String(v.clone())) {
            Ok(format) => settings.logging.format = format,
            Err(_) => warn!(key = "PULSE_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let result = parse_u32_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u32 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
