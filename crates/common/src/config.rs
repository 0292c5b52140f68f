//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default mixer settings.
    #[serde(default)]
    pub mixer: MixerDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resampling algorithm used when fitting a source frame into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAlgorithm {
    /// Nearest-neighbour sampling. Cheapest, blocky when upscaling.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
}

/// Default mixer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerDefaults {
    /// Initial canvas width. Zero leaves the canvas unconfigured.
    pub canvas_width: u32,

    /// Initial canvas height. Zero leaves the canvas unconfigured.
    pub canvas_height: u32,

    /// Resampler used for every slot.
    pub scaling: ScalingAlgorithm,

    /// Largest single frame buffer the allocator will hand out, in bytes.
    pub max_frame_bytes: usize,

    /// Appended to the mixer id to name its sink endpoint.
    pub sink_suffix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tessera_mixer=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for MixerDefaults {
    fn default() -> Self {
        Self {
            canvas_width: 0,
            canvas_height: 0,
            scaling: ScalingAlgorithm::default(),
            max_frame_bytes: 64 * 1024 * 1024,
            sink_suffix: "_MX".to_string(),
        }
    }
}

impl MixerDefaults {
    /// Name of the sink endpoint fed by mixer `mixer_id`.
    pub fn sink_name(&self, mixer_id: &str) -> String {
        format!("{mixer_id}{}", self.sink_suffix)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("tessera").join("config.json")
}
