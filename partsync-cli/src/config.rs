//! Reconciliation configuration with builder pattern
//!
//! Settings are read from TOML. Lookup order is an explicit path, then
//! `<config dir>/partsync/config.toml`, then the built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Complete configuration for a reconciliation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub keys: KeyConfig,
    pub markers: MarkerConfig,
    pub normalize: NormalizeConfig,
    pub matching: MatchingConfig,
}

/// Key column naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Canonical key column name
    pub key_column: String,
    /// Other spellings of the key column that get renamed to `key_column`
    pub aliases: Vec<String>,
    /// Name of the status column the classifier inserts
    pub status_column: String,
}

/// Status values driving the update policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Status that is left untouched
    pub skip: String,
    /// Status that updates an existing master row
    pub update: String,
    /// Value written to the lookup column before the terminal value
    pub intermediate: String,
    /// Terminal value for updated and inserted rows
    pub excluded: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Swap the first two columns of generic sheets
    pub swap_leading_columns: bool,
}

/// Column suggestion tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// First master column index offered as a lookup column
    pub window_start: usize,
    /// End (exclusive) of the offered lookup column window
    pub window_end: usize,
    /// Minimum similarity for a prefix/suffix candidate
    pub threshold: f64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            key_column: "PART NUMBER".to_string(),
            aliases: vec!["PART_NUMBER".to_string(), "PN".to_string()],
            status_column: "ACTIVATION_STATUS".to_string(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            skip: "X".to_string(),
            update: "D".to_string(),
            intermediate: "D".to_string(),
            excluded: "X".to_string(),
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            swap_leading_columns: true,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            window_start: 1,
            window_end: 22,
            threshold: 0.9,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            keys: KeyConfig::default(),
            markers: MarkerConfig::default(),
            normalize: NormalizeConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

impl ReconcileConfig {
    /// Create a new builder for ReconcileConfig
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::new()
    }

    /// Default location of the user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("partsync").join("config.toml"))
    }

    /// Load from an explicit path, the default location, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ReconcileError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => {
                log::debug!("Loading config from {}", default.display());
                Self::from_file(&default)
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ReconcileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconcileError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, ReconcileError> {
        let config: ReconcileConfig =
            toml::from_str(content).map_err(|e| ReconcileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ReconcileError> {
        toml::to_string_pretty(self).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.keys.key_column.trim().is_empty() {
            return Err(ReconcileError::Config("keys.key_column is empty".into()));
        }
        if self.keys.status_column.trim().is_empty() {
            return Err(ReconcileError::Config("keys.status_column is empty".into()));
        }
        let markers = [
            ("markers.skip", &self.markers.skip),
            ("markers.update", &self.markers.update),
            ("markers.intermediate", &self.markers.intermediate),
            ("markers.excluded", &self.markers.excluded),
        ];
        for (name, value) in markers {
            if value.is_empty() {
                return Err(ReconcileError::Config(format!("{} is empty", name)));
            }
        }
        if self.markers.skip == self.markers.update {
            return Err(ReconcileError::Config(
                "markers.skip and markers.update must differ".into(),
            ));
        }
        if self.matching.window_start >= self.matching.window_end {
            return Err(ReconcileError::Config(format!(
                "matching window [{}, {}) is empty",
                self.matching.window_start, self.matching.window_end
            )));
        }
        if !(0.0..=1.0).contains(&self.matching.threshold) {
            return Err(ReconcileError::Config(format!(
                "matching.threshold {} is outside [0, 1]",
                self.matching.threshold
            )));
        }
        Ok(())
    }
}

/// Builder for ReconcileConfig
#[derive(Debug)]
pub struct ReconcileConfigBuilder {
    config: ReconcileConfig,
}

impl ReconcileConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReconcileConfig::default(),
        }
    }

    pub fn key_column(mut self, name: impl Into<String>) -> Self {
        self.config.keys.key_column = name.into();
        self
    }

    pub fn key_aliases(mut self, aliases: Vec<String>) -> Self {
        self.config.keys.aliases = aliases;
        self
    }

    pub fn status_column(mut self, name: impl Into<String>) -> Self {
        self.config.keys.status_column = name.into();
        self
    }

    pub fn markers(mut self, markers: MarkerConfig) -> Self {
        self.config.markers = markers;
        self
    }

    pub fn swap_leading_columns(mut self, enabled: bool) -> Self {
        self.config.normalize.swap_leading_columns = enabled;
        self
    }

    pub fn column_window(mut self, start: usize, end: usize) -> Self {
        self.config.matching.window_start = start;
        self.config.matching.window_end = end;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.matching.threshold = threshold;
        self
    }

    pub fn build(self) -> ReconcileConfig {
        self.config
    }
}

impl Default for ReconcileConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
