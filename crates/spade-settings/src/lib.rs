//! # spade-settings
//!
//! Configuration management with layered sources for the spade client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`SpadeSettings::default()`]
//! 2. **User file** — `~/.spade/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `SPADE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    config_dir, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton, initialized on first access via
/// [`get_settings`].
static SETTINGS: OnceLock<SpadeSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.spade/settings.json` with env var
/// overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
pub fn get_settings() -> &'static SpadeSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
pub fn init_settings(settings: SpadeSettings) -> std::result::Result<(), SpadeSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
