// src/settings.rs

//! Persisted preferences: chain order, theme and output device.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Effect ids in chain order. Unknown ids are filtered when the chain is
    /// built from them.
    pub fx_chain_order: Vec<String>,
    pub theme: ThemeChoice,
    pub output_device: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fx_chain_order: Vec::new(),
            theme: ThemeChoice::Dark,
            output_device: None,
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "fxrack")?;
    let dir = dirs.config_dir().to_path_buf();
    if let Err(e) = fs::create_dir_all(&dir) {
        tracing::warn!("Failed to create config directory at {}: {}", dir.display(), e);
        return None;
    }
    Some(dir)
}

fn settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("settings.json"))
}

pub fn save_settings(settings: &AppSettings) {
    if let Some(path) = settings_path() {
        save_settings_to(&path, settings);
    }
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) {
    match serde_json::to_string_pretty(settings) {
        Ok(json_string) => {
            if let Err(e) = fs::write(path, json_string) {
                tracing::warn!("Failed to write settings to {}: {}", path.display(), e);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to serialize settings: {}", e);
        }
    }
}

pub fn load_settings() -> AppSettings {
    settings_path()
        .map(|path| load_settings_from(&path))
        .unwrap_or_default()
}

/// Missing, unreadable or corrupt files all give the defaults.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }
    match fs::read_to_string(path) {
        Ok(json_string) => match serde_json::from_str(&json_string) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults. Error: {}", e);
                AppSettings::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read settings file, using defaults. Error: {}", e);
            AppSettings::default()
        }
    }
}
