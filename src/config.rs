use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Settings, Theme};
use crate::storage::Store;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Invalid email '{0}'")]
    InvalidEmail(String),
}

pub fn settings_path(store: &Store) -> PathBuf {
    store.sibling(SETTINGS_FILE)
}

/// Loads settings, falling back to defaults when the file is missing.
#[tracing::instrument(skip(store))]
pub fn load_settings(store: &Store) -> Result<Settings, ConfigError> {
    let path = settings_path(store);
    if !path.exists() {
        debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }
    read_settings(&path)
}

fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(email) = &settings.remind_email {
        if validate_email(email).is_err() {
            warn!(email = %email, "stored reminder email looks invalid");
        }
    }
    Ok(settings)
}

/// Validates and writes settings.
#[tracing::instrument(skip(store, settings))]
pub fn save_settings(store: &Store, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(email) = &settings.remind_email {
        validate_email(email)?;
    }
    let path = settings_path(store);
    let text = toml::to_string_pretty(settings)?;
    fs::write(&path, text).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "saved settings");
    Ok(())
}

/// Requested changes to settings. `None` leaves a field alone.
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub remind_email: Option<String>,
    pub remind_by_email_enabled: Option<bool>,
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    /// Applies the patch. An empty email clears the stored address.
    pub fn apply(self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(email) = self.remind_email {
            let email = email.trim();
            if email.is_empty() {
                settings.remind_email = None;
            } else {
                validate_email(email)?;
                settings.remind_email = Some(email.to_string());
            }
        }
        if let Some(enabled) = self.remind_by_email_enabled {
            settings.remind_by_email_enabled = enabled;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        Ok(())
    }
}

/// Accepts `local@domain.tld` with no whitespace.
pub fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidEmail(email.to_string());
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let labels: Vec<&str> = domain.split('.').collect();
    if local.is_empty() || labels.len() < 2 || labels.iter().any(|l| l.is_empty()) || domain.contains('@') {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn email_validation() {
        assert!(validate_email("me@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.org").is_ok());
        for bad in ["", "me", "me@", "@example.com", "me@example", "me@@example.com", "me @x.io", "me@x..io"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn missing_file_gives_defaults_and_round_trips() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(dir.path()).unwrap();
        assert_eq!(load_settings(&store).unwrap(), Settings::default());

        let mut settings = Settings::default();
        SettingsPatch {
            remind_email: Some("me@example.com".into()),
            remind_by_email_enabled: Some(true),
            theme: Some(Theme::Dark),
        }
        .apply(&mut settings)
        .unwrap();
        save_settings(&store, &settings).unwrap();
        assert_eq!(load_settings(&store).unwrap(), settings);
    }

    #[test]
    fn patch_rejects_bad_email_and_clears_on_empty() {
        let mut settings = Settings {
            remind_email: Some("me@example.com".into()),
            ..Settings::default()
        };
        let bad = SettingsPatch { remind_email: Some("nope".into()), ..Default::default() };
        assert!(matches!(bad.apply(&mut settings), Err(ConfigError::InvalidEmail(_))));
        assert_eq!(settings.remind_email.as_deref(), Some("me@example.com"));

        let clear = SettingsPatch { remind_email: Some(String::new()), ..Default::default() };
        clear.apply(&mut settings).unwrap();
        assert_eq!(settings.remind_email, None);
    }
}
