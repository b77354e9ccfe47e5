//! Application settings persistence
//!
//! Stores user preferences and the remembered session in the
//! platform-specific app data folder:
//! - Linux: ~/.config/media-gallery/settings.json
//! - Windows: %APPDATA%/media-gallery/settings.json
//! - macOS: ~/Library/Application Support/media-gallery/settings.json

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::Session;

/// Application settings that persist between runs
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Email last used to sign in
    #[serde(default)]
    pub last_email: Option<String>,

    /// Directory of the last uploaded file
    #[serde(default)]
    pub last_upload_dir: Option<PathBuf>,

    /// Remembered session, restored on startup
    #[serde(default)]
    pub session: Option<Session>,
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Load settings from `path`, returning defaults if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        tracing::info!(
            "Loaded settings: email={:?}, upload_dir={:?}, session={}",
            settings.last_email,
            settings.last_upload_dir,
            settings.session.is_some()
        );

        Ok(settings)
    }

    /// Save settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        tracing::debug!("Saved settings to {:?}", path);

        Ok(())
    }

    /// Get the path to the settings file
    pub fn settings_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "media-gallery", "media-gallery")
            .context("Failed to determine settings directory")?;

        Ok(proj_dirs.config_dir().join("settings.json"))
    }

    /// Remember the email used to sign in
    pub fn set_email(&mut self, email: Option<&str>) {
        self.last_email = email.map(|s| s.to_string());
    }

    /// Remember the directory a file was uploaded from
    pub fn set_upload_source(&mut self, file: &Path) {
        self.last_upload_dir = file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
    }

    /// Resolve a relative upload path that doesn't exist in the working
    /// directory against the last upload directory
    pub fn resolve_upload_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        match &self.last_upload_dir {
            Some(dir) if dir.join(path).exists() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Record the current session. Returns whether it changed.
    pub fn set_session(&mut self, session: Option<Session>) -> bool {
        if self.session == session {
            return false;
        }
        self.session = session;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::User;
    use tempfile::TempDir;

    fn session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
            user: User {
                id: "user-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.last_email.is_none());
        assert!(settings.last_upload_dir.is_none());
        assert!(settings.session.is_none());
    }

    #[test]
    fn test_settings_set_email() {
        let mut settings = Settings::default();
        settings.set_email(Some("a@example.com"));
        assert_eq!(settings.last_email, Some("a@example.com".to_string()));

        settings.set_email(None);
        assert!(settings.last_email.is_none());
    }

    #[test]
    fn test_settings_set_upload_source() {
        let mut settings = Settings::default();
        settings.set_upload_source(Path::new("/home/me/Pictures/cat.png"));
        assert_eq!(settings.last_upload_dir, Some(PathBuf::from("/home/me/Pictures")));
    }

    #[test]
    fn test_settings_upload_source_without_directory() {
        let mut settings = Settings::default();
        settings.set_upload_source(Path::new("cat.png"));
        assert!(settings.last_upload_dir.is_none());
    }

    #[test]
    fn test_resolve_upload_path_uses_last_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("only-here-7f3a.png"), b"png").unwrap();

        let mut settings = Settings::default();
        let relative = Path::new("only-here-7f3a.png");
        assert_eq!(settings.resolve_upload_path(relative), PathBuf::from("only-here-7f3a.png"));

        settings.last_upload_dir = Some(dir.path().to_path_buf());
        assert_eq!(settings.resolve_upload_path(relative), dir.path().join("only-here-7f3a.png"));

        // Missing in both places stays as given
        let missing = Path::new("missing-7f3a.png");
        assert_eq!(settings.resolve_upload_path(missing), PathBuf::from("missing-7f3a.png"));
    }

    #[test]
    fn test_resolve_upload_path_keeps_absolute() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("absent.png");

        let settings = Settings {
            last_upload_dir: Some(PathBuf::from("/elsewhere")),
            ..Settings::default()
        };
        assert_eq!(settings.resolve_upload_path(&absolute), absolute);
    }

    #[test]
    fn test_set_session_reports_changes() {
        let mut settings = Settings {
            session: Some(session()),
            ..Settings::default()
        };
        assert!(!settings.set_session(Some(session())));

        // An expired session dropped by the provider must be forgotten
        assert!(settings.set_session(None));
        assert!(settings.session.is_none());
        assert!(!settings.set_session(None));
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            last_email: Some("a@example.com".to_string()),
            last_upload_dir: Some(PathBuf::from("/tmp")),
            session: Some(session()),
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_settings_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_settings_partial_deserialization() {
        let json = r#"{"last_email": "test@example.com"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.last_email, Some("test@example.com".to_string()));
        assert!(settings.last_upload_dir.is_none());
        assert!(settings.session.is_none());
    }

    #[test]
    fn test_settings_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
