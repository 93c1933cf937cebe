use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::utils::sync::{read, write};

/// Overrides `gateway_url` when set.
pub const GATEWAY_ENV: &str = "SIGNAL_PATTERNS_GATEWAY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub gateway_url: String,
    pub dit_duration_ms: u64,
    pub tone_frequency_hz: f32,
    pub pattern_save_delay_ms: u64,
    pub morse_save_delay_ms: u64,
    pub speaker_save_delay_ms: u64,
    pub min_timeline_width_px: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            gateway_url: "http://192.168.4.1".into(),
            dit_duration_ms: 200,
            tone_frequency_hz: 335.0,
            pattern_save_delay_ms: 5000,
            morse_save_delay_ms: 5000,
            speaker_save_delay_ms: 500,
            min_timeline_width_px: 300.0,
        }
    }
}

impl EditorSettings {
    pub fn pattern_save_delay(&self) -> Duration {
        Duration::from_millis(self.pattern_save_delay_ms)
    }

    pub fn morse_save_delay(&self) -> Duration {
        Duration::from_millis(self.morse_save_delay_ms)
    }

    pub fn speaker_save_delay(&self) -> Duration {
        Duration::from_millis(self.speaker_save_delay_ms)
    }

    fn with_env_override(mut self, gateway: Option<String>) -> Self {
        if let Some(url) = gateway.filter(|url| !url.trim().is_empty()) {
            self.gateway_url = url;
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EditorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EditorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Current settings with the environment override applied.
    pub fn editor(&self) -> EditorSettings {
        read(&self.data)
            .clone()
            .with_env_override(std::env::var(GATEWAY_ENV).ok())
    }

    /// Writes `settings` to disk, then makes them current. A failed write
    /// leaves the previous settings in place.
    pub fn update(&self, settings: EditorSettings) -> Result<()> {
        let mut guard = write(&self.data);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EditorSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *write(&self.data) = data;
        Ok(())
    }

    fn persist(&self, data: &EditorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = read(&store.data).clone();
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.dit_duration_ms, 200);
        assert_eq!(settings.tone_frequency_hz, 335.0);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(*read(&store.data), EditorSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dit_duration_ms": 120}"#).unwrap();
        let store = SettingsStore::new(path).unwrap();
        let settings = read(&store.data).clone();
        assert_eq!(settings.dit_duration_ms, 120);
        assert_eq!(settings.speaker_save_delay(), Duration::from_millis(500));
    }

    #[test]
    fn update_persists_and_reload_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut changed = EditorSettings::default();
        changed.morse_save_delay_ms = 10;
        store.update(changed.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(*read(&reopened.data), changed);

        fs::write(&path, r#"{"pattern_save_delay_ms": 7}"#).unwrap();
        reopened.reload().unwrap();
        assert_eq!(read(&reopened.data).pattern_save_delay_ms, 7);

        fs::write(&path, "garbage").unwrap();
        assert!(reopened.reload().is_err());
        assert_eq!(read(&reopened.data).pattern_save_delay_ms, 7);
    }

    #[test]
    fn failed_update_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        // The parent directory does not exist, so every write fails.
        let store = SettingsStore::new(dir.path().join("missing").join("settings.json")).unwrap();

        let mut changed = EditorSettings::default();
        changed.dit_duration_ms = 80;
        assert!(store.update(changed).is_err());
        assert_eq!(*read(&store.data), EditorSettings::default());
    }

    #[test]
    fn env_override_replaces_gateway_url() {
        let base = EditorSettings::default();
        let url = "http://10.0.0.5".to_string();
        assert_eq!(base.clone().with_env_override(Some(url.clone())).gateway_url, url);
        assert_eq!(
            base.clone().with_env_override(Some("  ".into())).gateway_url,
            base.gateway_url
        );
        assert_eq!(base.clone().with_env_override(None), base);
    }
}
