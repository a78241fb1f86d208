// Editor settings
// Loaded from ~/.config/notegrid/settings.json

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How an interaction turns into a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Save on the scheduling turn after the interaction (default)
    #[default]
    NextTurn,
    /// Save once interactions have been quiet for `save.debounceMs`
    Debounce,
}

#[derive(Debug)]
pub enum SettingsError {
    /// File could not be read or written.
    Io(String),
    /// File contents are not valid settings JSON.
    Parse(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "settings IO error: {msg}"),
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Saving
    #[serde(rename = "save.policy")]
    pub save_policy: SavePolicy,

    #[serde(rename = "save.debounceMs")]
    pub save_debounce_ms: u64,

    #[serde(rename = "save.gateMs")]
    pub save_gate_ms: u64,

    #[serde(rename = "save.autoSaveIntervalMs")]
    pub auto_save_interval_ms: Option<u64>,  // None = disabled

    // Triggers
    #[serde(rename = "triggers.container")]
    pub container_triggers: bool,

    #[serde(rename = "triggers.document")]
    pub document_triggers: bool,

    // Host
    #[serde(rename = "host.debounceSaveMs")]
    pub host_debounce_save_ms: u64,

    #[serde(rename = "host.waitForContent")]
    pub wait_for_content: bool,

    #[serde(rename = "host.preview")]
    pub preview: String,

    // New workbooks
    #[serde(rename = "workbook.name")]
    pub workbook_name: String,

    #[serde(rename = "workbook.locale")]
    pub workbook_locale: String,

    #[serde(rename = "workbook.timezone")]
    pub workbook_timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Saving
            save_policy: SavePolicy::NextTurn,
            save_debounce_ms: 300,
            save_gate_ms: 500,
            auto_save_interval_ms: None,
            // Triggers
            container_triggers: true,
            document_triggers: true,
            // Host
            host_debounce_save_ms: 400,
            wait_for_content: true,
            preview: "Spreadsheet".to_string(),
            // New workbooks
            workbook_name: "Spreadsheet".to_string(),
            workbook_locale: "en".to_string(),
            workbook_timezone: "UTC".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notegrid");
        config_dir.join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a file, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{} ({}); using default settings", e, path.display());
                Self::default()
            }
        }
    }

    /// Read and parse a settings file, reporting errors
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to a file
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;

        fs::write(path, json).map_err(|e| SettingsError::Io(e.to_string()))
    }

    /// Autosave period, if enabled and non-zero
    pub fn auto_save_interval(&self) -> Option<std::time::Duration> {
        self.auto_save_interval_ms
            .filter(|ms| *ms > 0)
            .map(std::time::Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.save_policy, SavePolicy::NextTurn);
        assert_eq!(s.save_gate_ms, 500);
        assert_eq!(s.host_debounce_save_ms, 400);
        assert!(s.container_triggers && s.document_triggers);
        assert!(s.wait_for_content);
        assert_eq!(s.workbook_name, "Spreadsheet");
        assert!(s.auto_save_interval().is_none());
    }

    #[test]
    fn test_parse_with_comments_and_partial_keys() {
        let json = r#"{
            // Prefer a quiet period over per-event saves
            "save.policy": "debounce",
            "save.debounceMs": 750,
            "triggers.document": false
        }"#;
        let s = Settings::parse(json).unwrap();
        assert_eq!(s.save_policy, SavePolicy::Debounce);
        assert_eq!(s.save_debounce_ms, 750);
        assert!(!s.document_triggers);
        // Untouched keys keep defaults
        assert_eq!(s.save_gate_ms, 500);
        assert!(s.container_triggers);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let s = Settings::parse(r#"{"grid.rowHeight": 24}"#).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_bad_policy_is_parse_error() {
        let err = Settings::parse(r#"{"save.policy": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_zero_autosave_disabled() {
        let s = Settings {
            auto_save_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(s.auto_save_interval().is_none());

        let s = Settings {
            auto_save_interval_ms: Some(30_000),
            ..Default::default()
        };
        assert_eq!(s.auto_save_interval(), Some(std::time::Duration::from_secs(30)));
    }
}
