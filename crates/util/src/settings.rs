//! Console settings persistence.
//!
//! Settings live in a small JSON file under the platform configuration
//! directory (`~/.config/launchdeck/settings.json` on most platforms). The
//! location can be overridden through [`SETTINGS_PATH_ENV`]; a leading `~`
//! in the override is expanded to the home directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dirs_next::{config_dir, home_dir};
use launchdeck_types::ConsoleContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable allowing callers to override the settings file path.
pub const SETTINGS_PATH_ENV: &str = "LAUNCHDECK_SETTINGS_PATH";

pub const SETTINGS_FILE_NAME: &str = "settings.json";

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted console settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Controller base URL, used when `CONTROLLER_HOST` is unset.
    pub host: Option<String>,
    /// OAuth token, used when `CONTROLLER_OAUTH_TOKEN` is unset.
    pub token: Option<String>,
    pub default_timezone: String,
    pub page_size: u32,
    pub brand_name: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        let context = ConsoleContext::default();
        Self {
            host: None,
            token: None,
            default_timezone: context.default_timezone,
            page_size: DEFAULT_PAGE_SIZE,
            brand_name: context.brand_name,
        }
    }
}

impl ConsoleSettings {
    /// Read-only context handed to screens. Superuser status comes from the
    /// authenticated session, not from the file.
    pub fn console_context(&self, is_superuser: bool) -> ConsoleContext {
        ConsoleContext {
            brand_name: self.brand_name.clone(),
            is_superuser,
            default_timezone: self.default_timezone.clone(),
        }
    }
}

/// Thread-safe settings store backed by a JSON file.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    payload: Mutex<ConsoleSettings>,
    persist_to_disk: bool,
}

impl SettingsStore {
    /// Open the store at the default (or overridden) location.
    pub fn new() -> Result<Self, SettingsError> {
        Self::open(default_settings_path())
    }

    /// Open the store at an explicit path. A missing file yields defaults.
    pub fn open(path: PathBuf) -> Result<Self, SettingsError> {
        let payload = load_payload(&path)?;
        debug!(path = %path.display(), "loaded console settings");
        Ok(Self {
            path,
            payload: Mutex::new(payload),
            persist_to_disk: true,
        })
    }

    /// In-memory store used when the config directory cannot be accessed.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            payload: Mutex::new(ConsoleSettings::default()),
            persist_to_disk: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> ConsoleSettings {
        self.lock().clone()
    }

    /// Apply `change` and write the result back to disk.
    pub fn update(&self, change: impl FnOnce(&mut ConsoleSettings)) -> Result<(), SettingsError> {
        let mut payload = self.lock();
        change(&mut payload);
        if self.persist_to_disk {
            self.save_locked(&payload)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleSettings> {
        self.payload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_locked(&self, payload: &ConsoleSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(payload)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

fn default_settings_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_home(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("launchdeck")
        .join(SETTINGS_FILE_NAME)
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path {
        "~" => "",
        other => match other.strip_prefix("~/").or_else(|| other.strip_prefix("~\\")) {
            Some(rest) => rest,
            None => return PathBuf::from(other),
        },
    };
    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

fn load_payload(path: &Path) -> Result<ConsoleSettings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(payload) => Ok(payload),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to parse settings file; using defaults"
                );
                Ok(ConsoleSettings::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(ConsoleSettings::default()),
        Err(error) => Err(SettingsError::Io(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults_and_update_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let store = SettingsStore::open(path.clone()).expect("open store");
        assert_eq!(store.settings(), ConsoleSettings::default());

        store
            .update(|settings| {
                settings.host = Some("https://controller.example.com".to_string());
                settings.default_timezone = "Europe/Berlin".to_string();
            })
            .expect("update settings");

        let reopened = SettingsStore::open(path).expect("reopen store");
        let settings = reopened.settings();
        assert_eq!(settings.host.as_deref(), Some("https://controller.example.com"));
        assert_eq!(settings.default_timezone, "Europe/Berlin");
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").expect("write corrupt file");

        let store = SettingsStore::open(path).expect("open store");
        assert_eq!(store.settings(), ConsoleSettings::default());
    }

    #[test]
    fn ephemeral_store_does_not_touch_disk() {
        let store = SettingsStore::ephemeral();
        store.update(|settings| settings.page_size = 50).expect("update");
        assert_eq!(store.settings().page_size, 50);
        assert_eq!(store.path(), Path::new(""));
    }

    #[test]
    fn console_context_carries_branding() {
        let settings = ConsoleSettings {
            brand_name: "Tower".to_string(),
            ..ConsoleSettings::default()
        };
        let context = settings.console_context(true);
        assert_eq!(context.brand_name, "Tower");
        assert!(context.is_superuser);
    }

    #[test]
    fn home_expansion_leaves_plain_paths_alone() {
        assert_eq!(expand_home("/etc/launchdeck.json"), PathBuf::from("/etc/launchdeck.json"));
        if let Some(home) = home_dir() {
            assert_eq!(expand_home("~/cfg.json"), home.join("cfg.json"));
        }
    }
}
