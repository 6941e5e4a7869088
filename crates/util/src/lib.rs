//! Small helpers shared by the launchdeck crates: the settings file and
//! secret redaction for logs and dry-run output.

pub mod settings;
pub mod text_processing;

pub use settings::{ConsoleSettings, SETTINGS_PATH_ENV, SettingsError, SettingsStore};
pub use text_processing::{redact_json, redact_sensitive};
