use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric tolerances and playback defaults used by the mapping engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    // Evaluation
    pub opacity_epsilon: f64,
    pub physics_epsilon: f64,
    pub min_bpm: f64,

    // Playback
    pub default_bpm: f64,
    pub target_fps: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            opacity_epsilon: 0.001,
            physics_epsilon: 1e-4,
            min_bpm: 1.0,
            default_bpm: 120.0,
            target_fps: 60,
        }
    }
}

/// Configuration manager for engine settings.
/// Settings are stored as versioned JSON, `lumen.json` in the working
/// directory by default.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: EngineSettings,
    created_at: Option<String>,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub engine: EngineConfigSchema,
    pub playback: PlaybackConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfigSchema {
    pub opacity_epsilon: ConfigOption<f64>,
    pub physics_epsilon: ConfigOption<f64>,
    pub min_bpm: ConfigOption<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfigSchema {
    pub default_bpm: ConfigOption<f64>,
    pub target_fps: ConfigOption<u32>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
}

impl<T: PartialOrd + Copy> ConfigOption<T> {
    fn check(&self, name: &str, value: T, errors: &mut Vec<String>)
    where
        T: std::fmt::Debug,
    {
        if let Some((min, max)) = self.valid_range {
            if !(value >= min && value <= max) {
                errors.push(format!("{} must be between {:?} and {:?}", name, min, max));
            }
        }
        if let Some(choices) = &self.valid_choices {
            if !choices.iter().any(|c| *c == value) {
                errors.push(format!("{} must be one of: {:?}", name, choices));
            }
        }
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: EngineSettings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'lumen.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("lumen.json"));

        Self {
            config_path,
            settings: EngineSettings::default(),
            created_at: None,
        }
    }

    /// Load settings from configuration file
    /// Writes a default file if none exists yet
    pub fn load(&mut self) -> Result<EngineSettings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match engine version {}, new settings use defaults",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        self.created_at = Some(config_file.created_at);
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: self.created_at.clone().unwrap_or_else(|| now.clone()),
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        log::debug!("Saved engine settings to {}", self.config_path.display());
        Ok(())
    }

    /// Update settings and save to file
    pub fn update_settings(&mut self, settings: EngineSettings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = EngineSettings::default();
        ConfigSchema {
            engine: EngineConfigSchema {
                opacity_epsilon: ConfigOption {
                    default: defaults.opacity_epsilon,
                    valid_range: Some((0.0, 0.5)),
                    valid_choices: None,
                    description: "Objects at or below this opacity are not emitted".to_string(),
                },
                physics_epsilon: ConfigOption {
                    default: defaults.physics_epsilon,
                    valid_range: Some((0.0, 1.0)),
                    valid_choices: None,
                    description: "Physics envelope magnitude treated as settled".to_string(),
                },
                min_bpm: ConfigOption {
                    default: defaults.min_bpm,
                    valid_range: Some((0.001, 60.0)),
                    valid_choices: None,
                    description: "Tempo floor used for beat to second conversion".to_string(),
                },
            },
            playback: PlaybackConfigSchema {
                default_bpm: ConfigOption {
                    default: defaults.default_bpm,
                    valid_range: Some((1.0, 999.0)),
                    valid_choices: None,
                    description: "Tempo used when the caller does not supply one".to_string(),
                },
                target_fps: ConfigOption {
                    default: defaults.target_fps,
                    valid_range: None,
                    valid_choices: Some(vec![24, 25, 30, 48, 50, 60, 90, 120]),
                    description: "Frames per second for offline rendering".to_string(),
                },
            },
        }
    }

    /// Validate settings against schema, collecting every violation
    pub fn validate_settings(settings: &EngineSettings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        schema
            .engine
            .opacity_epsilon
            .check("opacity_epsilon", settings.opacity_epsilon, &mut errors);
        schema
            .engine
            .physics_epsilon
            .check("physics_epsilon", settings.physics_epsilon, &mut errors);
        schema.engine.min_bpm.check("min_bpm", settings.min_bpm, &mut errors);
        schema
            .playback
            .default_bpm
            .check("default_bpm", settings.default_bpm, &mut errors);
        schema
            .playback
            .target_fps
            .check("target_fps", settings.target_fps, &mut errors);

        if settings.default_bpm < settings.min_bpm {
            errors.push("default_bpm must not be below min_bpm".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = EngineSettings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Failed to parse config file: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}
