// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for KEYREC.
//!
//! Settings for chord capture, MIDI export and the melody
//! generation service. Files are YAML (`.yaml`, `.yml`) or TOML
//! (`.toml`); every section and field is optional.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::recording::{DEFAULT_FILE_NAME, DEFAULT_NOTE_DURATION};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    /// Chord capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// MIDI export settings
    #[serde(default)]
    pub export: ExportConfig,
    /// Generation service settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl AppConfig {
    /// Load configuration, choosing the format from the file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents)?,
            _ => Self::from_yaml(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let duration = self.capture.chord_duration;
        if !duration.is_finite() || duration <= 0.0 {
            bail!("capture.chord_duration must be > 0, got {}", duration);
        }
        if self.export.ppqn == 0 {
            bail!("export.ppqn must be > 0");
        }
        if !(20.0..=300.0).contains(&self.export.tempo) {
            bail!("export.tempo must be within 20-300 BPM, got {}", self.export.tempo);
        }
        if !(1..=127).contains(&self.export.velocity) {
            bail!("export.velocity must be within 1-127, got {}", self.export.velocity);
        }
        if self.export.channel > 15 {
            bail!("export.channel must be within 0-15, got {}", self.export.channel);
        }
        if self.export.file_name.trim().is_empty() {
            bail!("export.file_name must not be empty");
        }
        if self.generation.endpoint.trim().is_empty() {
            bail!("generation.endpoint must not be empty");
        }
        Ok(())
    }
}

/// Chord capture settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Duration of each captured chord in seconds
    #[serde(default = "default_chord_duration")]
    pub chord_duration: f64,
}

fn default_chord_duration() -> f64 {
    DEFAULT_NOTE_DURATION
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chord_duration: default_chord_duration(),
        }
    }
}

/// MIDI export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// File name written by an export
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Ticks per quarter note
    #[serde(default = "default_ppqn")]
    pub ppqn: u16,
    /// Tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Note-on velocity (1-127)
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    /// MIDI channel (0-15)
    #[serde(default)]
    pub channel: u8,
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}
fn default_ppqn() -> u16 {
    480
}
fn default_tempo() -> f64 {
    120.0
}
fn default_velocity() -> u8 {
    127
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            ppqn: default_ppqn(),
            tempo: default_tempo(),
            velocity: default_velocity(),
            channel: 0,
        }
    }
}

/// Generation service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// URL the note payload is posted to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://run-model.azurewebsites.net".to_string()
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
