// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Defaults, then an optional YAML file, then environment overrides.
//! The YAML file is `cuepoint.yaml` in the working directory unless
//! `CUEPOINT_CONFIG` points elsewhere.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_VAR: &str = "CUEPOINT_CONFIG";
pub const API_URL_VAR: &str = "CUEPOINT_API_URL";
pub const API_TOKEN_VAR: &str = "CUEPOINT_API_TOKEN";
const DEFAULT_CONFIG_FILE: &str = "cuepoint.yaml";

/// Timing tolerances used by the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Backwards jumps larger than this are treated as rewinds.
    pub rewind_epsilon_secs: f64,
    /// Playback times below this count as a restart from the beginning.
    pub restart_threshold_secs: f64,
    /// Step used by the skip buttons.
    pub skip_secs: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            rewind_epsilon_secs: 1.0,
            restart_threshold_secs: 0.5,
            skip_secs: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL. Without one the app works offline.
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    /// `ffprobe` binary used to read the duration of non-HLS videos.
    pub ffprobe_path: String,
    pub playback: PlaybackSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout_secs: 15,
            ffprobe_path: "ffprobe".to_string(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default locations and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            let config = Self::from_file(&path)?;
            log::info!("Loaded configuration from {}", path.display());
            config
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override fields from environment variables found by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url.trim().trim_end_matches('/').to_string());
        }
        if let Some(token) = lookup(API_TOKEN_VAR).filter(|v| !v.trim().is_empty()) {
            self.api_token = Some(token.trim().to_string());
        }
    }

    pub fn is_offline(&self) -> bool {
        self.api_base_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.is_offline());
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(config.playback.rewind_epsilon_secs, 1.0);
        assert_eq!(config.playback.restart_threshold_secs, 0.5);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml(
            "api_base_url: https://api.example.com\nplayback:\n  skip_secs: 5.0\n",
        )
        .unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.playback.skip_secs, 5.0);
        assert_eq!(config.playback.rewind_epsilon_secs, 1.0);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.ffprobe_path, "ffprobe");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_yaml("api_base_url: https://old.example.com\n").unwrap();
        config.apply_env(|key| match key {
            API_URL_VAR => Some("https://new.example.com/".to_string()),
            API_TOKEN_VAR => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url.as_deref(), Some("https://new.example.com"));
        assert!(config.api_token.is_none());
    }
}
