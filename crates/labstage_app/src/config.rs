// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application configuration.
//!
//! Read from a RON file (`labstage.ron` by default). Every section falls back
//! to its defaults when absent, and a missing file means an all-default
//! configuration.

use labstage_sequencer::{DuplicatePolicy, RearmPolicy};
use labstage_stage::{Smoothing, StageSettings, ZoomDistances};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "labstage.ron";

/// Errors from reading or writing the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid RON for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
    /// File was written by a newer version
    #[error("Configuration version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// Main window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial inner width in logical pixels
    pub width: f64,
    /// Initial inner height in logical pixels
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "LabStage".to_string(),
            width: 1440.0,
            height: 900.0,
        }
    }
}

/// Animation tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnimationConfig {
    /// Approach rate for animators and the camera
    pub smoothing: Smoothing,
    /// Handling of conflicting actions within a step
    pub duplicate_policy: DuplicatePolicy,
    /// What scrubbing does to a running step timer
    pub rearm_policy: RearmPolicy,
    /// Camera distance per zoom hint
    pub camera_zoom: ZoomDistances,
}

impl AnimationConfig {
    /// Settings for a new stage
    pub fn stage_settings(&self) -> StageSettings {
        StageSettings {
            smoothing: self.smoothing,
            duplicate_policy: self.duplicate_policy,
            zoom: self.camera_zoom,
        }
    }
}

/// Which service answers generation and chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Backend {
    /// Gemini-style `generateContent` REST API
    #[default]
    Gemini,
    /// Offline: scene documents from a local JSON file
    File,
}

/// Scene generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Service backend
    pub backend: Backend,
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Scene file served by the file backend
    pub scene_file: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Gemini,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 90,
            scene_file: None,
        }
    }
}

/// Lab assistant chat settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of prior turns sent with each message
    pub context_turns: usize,
    /// Reply shown when the service fails
    pub fallback_reply: String,
    /// Reply shown when the service answers with nothing
    pub empty_reply: String,
    /// Post each step's chatbot update as it is reached
    pub narrate_steps: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_turns: 20,
            fallback_reply: "Connection to the Science Core interrupted.".to_string(),
            empty_reply: "I'm having trouble analyzing the data right now.".to_string(),
            narrate_steps: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format version
    pub version: u32,
    /// Main window
    pub window: WindowConfig,
    /// Animation tuning
    pub animation: AnimationConfig,
    /// Scene generation
    pub generation: GenerationConfig,
    /// Lab assistant chat
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            window: WindowConfig::default(),
            animation: AnimationConfig::default(),
            generation: GenerationConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(text)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load a configuration file, or defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Pretty RON text for this configuration
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
