//! Configuration management for challan
//!
//! Config stored at: ~/.config/challan/config.json
//!
//! Values are layered: file (or defaults), then `CHALLAN_*` environment
//! variables, then whatever the caller overrides from the command line.

use challan_domain::model::{ReviewConfig, RuleConfig};
use challan_types::{ConfigError, OutputFormat, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIDENCE_THRESHOLD: &str = "CHALLAN_CONFIDENCE_THRESHOLD";
pub const ENV_DETECTOR_CMD: &str = "CHALLAN_DETECTOR_CMD";
pub const ENV_RECOGNIZER_CMD: &str = "CHALLAN_RECOGNIZER_CMD";
pub const ENV_CACHE_DIR: &str = "CHALLAN_CACHE_DIR";

/// Plate acceptance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    /// Recognized text must be strictly more confident than this
    #[serde(default = "default_plate_confidence")]
    pub min_confidence: f32,
}

fn default_plate_confidence() -> f32 {
    0.5
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_plate_confidence(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum confidence passed to the object detector
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Command line of the object-detection runner
    #[serde(default)]
    pub detector_command: Option<String>,

    /// Command line of the text-recognition runner
    #[serde(default)]
    pub recognizer_command: Option<String>,

    /// Enable result caching
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache directory override
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a cached result stays retrievable
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default)]
    pub rules: RuleConfig,

    #[serde(default)]
    pub plates: PlateConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            detector_command: None,
            recognizer_command: None,
            cache_enabled: true,
            cache_dir: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            output_format: OutputFormat::default(),
            rules: RuleConfig::default(),
            plates: PlateConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("challan");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or(ConfigError::NotFound)?
            .join("challan");
        Ok(cache_dir)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Load config from the default location with environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from a file, or defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `CHALLAN_*` overrides from a variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CONFIDENCE_THRESHOLD) {
            self.confidence_threshold = value.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{}={:?}", ENV_CONFIDENCE_THRESHOLD, value))
            })?;
        }
        if let Some(value) = lookup(ENV_DETECTOR_CMD) {
            self.detector_command = Some(value);
        }
        if let Some(value) = lookup(ENV_RECOGNIZER_CMD) {
            self.recognizer_command = Some(value);
        }
        if let Some(value) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(value));
        }
        self.validate()
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidValue(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            ))
            .into());
        }
        if !unit.contains(&self.plates.min_confidence) {
            return Err(ConfigError::InvalidValue(format!(
                "plates.min_confidence must be in [0, 1], got {}",
                self.plates.min_confidence
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.review.min_quality) {
            return Err(ConfigError::InvalidValue(format!(
                "review.min_quality must be in [0, 1], got {}",
                self.review.min_quality
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.rules.helmet_coverage_threshold)
            || !(0.0..=1.0).contains(&self.rules.head_region_fraction)
        {
            return Err(ConfigError::InvalidValue(
                "rules.helmet_coverage_threshold and rules.head_region_fraction must be in [0, 1]"
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Challan Configuration")?;
        writeln!(f, "=====================")?;
        writeln!(f)?;
        writeln!(f, "Confidence threshold: {}", self.confidence_threshold)?;
        writeln!(
            f,
            "Detector command:     {}",
            self.detector_command.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(
            f,
            "Recognizer command:   {}",
            self.recognizer_command.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(f, "Cache enabled:        {}", self.cache_enabled)?;
        writeln!(
            f,
            "Cache dir:            {}",
            self.cache_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Cache TTL:            {}s", self.cache_ttl_secs)?;
        writeln!(f, "Output format:        {}", self.output_format)?;
        writeln!(f, "Plate min confidence: {}", self.plates.min_confidence)?;
        writeln!(f, "Review min quality:   {}", self.review.min_quality)?;
        writeln!(f)?;
        writeln!(f, "Rules")?;
        writeln!(f, "  Helmet proximity:        {} px", self.rules.helmet_proximity_px)?;
        writeln!(f, "  Triple-riding proximity: {} px", self.rules.triple_riding_proximity_px)?;
        writeln!(f, "  Helmet coverage:         {}", self.rules.helmet_coverage_threshold)?;
        writeln!(f, "  Head region fraction:    {}", self.rules.head_region_fraction)?;
        writeln!(f, "  Max riders:              {}", self.rules.max_riders)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:          {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use challan_types::Error;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.plates.min_confidence, 0.5);
        assert_eq!(config.rules.max_riders, 2);
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"confidence_threshold": 0.4, "rules": {"max_riders": 3}}"#)
                .unwrap();
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.rules.max_riders, 3);
        assert_eq!(config.rules.helmet_proximity_px, 50.0);
        assert_eq!(config.review.min_quality, 0.5);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let config = Config {
            detector_command: Some("python3 detect.py".to_string()),
            output_format: OutputFormat::Json,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_CONFIDENCE_THRESHOLD, "0.55"),
            (ENV_DETECTOR_CMD, "yolo-runner --weights best.pt"),
            (ENV_CACHE_DIR, "/tmp/challan-cache"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.confidence_threshold, 0.55);
        assert_eq!(
            config.detector_command.as_deref(),
            Some("yolo-runner --weights best.pt")
        );
        assert_eq!(config.recognizer_command, None);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/challan-cache"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let result = config.apply_env_with(|key| {
            (key == ENV_CONFIDENCE_THRESHOLD).then(|| "high".to_string())
        });
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidValue(_)))));

        let result = config.apply_env_with(|key| {
            (key == ENV_CONFIDENCE_THRESHOLD).then(|| "1.5".to_string())
        });
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidValue(_)))));
    }
}
