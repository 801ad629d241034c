use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GaaConfig {
    pub geometry: GeometrySection,
    pub oscillator: OscillatorSection,
    pub safety: SafetySection,
    pub breath: BreathSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySection {
    /// Tessellation resolution (rings and segments per layer shell).
    pub resolution: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorSection {
    /// Hard pool capacity; admission controlled, never evicting.
    pub max_voices: usize,
    /// Teardown fade length in milliseconds.
    pub fade_ms: f32,
    /// Sample rate used by the render path.
    pub sample_rate_hz: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySection {
    /// Normalized peak above which audio is critical.
    pub audio_peak_critical: f32,
    /// Normalized RMS above which audio is a warning.
    pub audio_rms_warning: f32,
    /// Flash rate in Hz above which visuals are critical.
    pub flash_rate_critical_hz: f32,
    /// Breaths per minute above which breathing is critical.
    pub breathing_critical_bpm: f32,
    /// Session length in minutes past which a warning fires.
    pub duration_warning_min: f32,
    /// Session length in minutes past which the alert is critical.
    pub duration_critical_min: f32,
    /// Per-category alert deduplication window in seconds.
    pub dedup_window_sec: f32,
    /// Bounded alert history length.
    pub max_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathSection {
    pub default_target_bpm: f32,
}

impl Default for GeometrySection {
    fn default() -> Self {
        Self { resolution: 12 }
    }
}

impl Default for OscillatorSection {
    fn default() -> Self {
        Self {
            max_voices: 32,
            fade_ms: 120.0,
            sample_rate_hz: 48_000.0,
        }
    }
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            audio_peak_critical: 0.90,
            audio_rms_warning: 0.70,
            flash_rate_critical_hz: 3.0,
            breathing_critical_bpm: 30.0,
            duration_warning_min: 20.0,
            duration_critical_min: 45.0,
            dedup_window_sec: 5.0,
            max_history: 100,
        }
    }
}

impl Default for BreathSection {
    fn default() -> Self {
        Self {
            default_target_bpm: 6.0,
        }
    }
}

impl GaaConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: GaaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment overrides applied on top.
    /// Variables are prefixed with GAA_, e.g. GAA_GEOMETRY_RESOLUTION=16.
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        use std::env;

        fn parse<T: std::str::FromStr>(key: &str, val: String) -> Result<T, ConfigError> {
            val.parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))
        }

        if let Ok(val) = env::var("GAA_GEOMETRY_RESOLUTION") {
            self.geometry.resolution = parse("GAA_GEOMETRY_RESOLUTION", val)?;
        }
        if let Ok(val) = env::var("GAA_OSCILLATOR_MAX_VOICES") {
            self.oscillator.max_voices = parse("GAA_OSCILLATOR_MAX_VOICES", val)?;
        }
        if let Ok(val) = env::var("GAA_OSCILLATOR_FADE_MS") {
            self.oscillator.fade_ms = parse("GAA_OSCILLATOR_FADE_MS", val)?;
        }
        if let Ok(val) = env::var("GAA_SAFETY_DEDUP_WINDOW_SEC") {
            self.safety.dedup_window_sec = parse("GAA_SAFETY_DEDUP_WINDOW_SEC", val)?;
        }
        if let Ok(val) = env::var("GAA_BREATH_DEFAULT_TARGET_BPM") {
            self.breath.default_target_bpm = parse("GAA_BREATH_DEFAULT_TARGET_BPM", val)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry.resolution < 3 {
            return Err(ConfigError::Validation(
                "geometry.resolution must be >= 3".to_string(),
            ));
        }
        if self.oscillator.max_voices == 0 || self.oscillator.max_voices > 256 {
            return Err(ConfigError::Validation(
                "oscillator.max_voices must be in [1, 256]".to_string(),
            ));
        }
        if !(50.0..=1_000.0).contains(&self.oscillator.fade_ms) {
            return Err(ConfigError::Validation(
                "oscillator.fade_ms must be in [50, 1000]".to_string(),
            ));
        }
        if self.oscillator.sample_rate_hz < 8_000.0 {
            return Err(ConfigError::Validation(
                "oscillator.sample_rate_hz must be >= 8000".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.safety.audio_peak_critical)
            || !(0.0..=1.0).contains(&self.safety.audio_rms_warning)
        {
            return Err(ConfigError::Validation(
                "safety audio thresholds must be in [0, 1]".to_string(),
            ));
        }
        if self.safety.duration_critical_min <= self.safety.duration_warning_min {
            return Err(ConfigError::Validation(
                "safety.duration_critical_min must be > duration_warning_min".to_string(),
            ));
        }
        if self.safety.dedup_window_sec <= 0.0 {
            return Err(ConfigError::Validation(
                "safety.dedup_window_sec must be positive".to_string(),
            ));
        }
        if self.safety.max_history == 0 {
            return Err(ConfigError::Validation(
                "safety.max_history must be > 0".to_string(),
            ));
        }
        if !(1.0..=30.0).contains(&self.breath.default_target_bpm) {
            return Err(ConfigError::Validation(
                "breath.default_target_bpm must be in [1, 30]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(GaaConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_resolution_is_rejected() {
        let mut cfg = GaaConfig::default();
        cfg.geometry.resolution = 1;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn inverted_duration_marks_are_rejected() {
        let mut cfg = GaaConfig::default();
        cfg.safety.duration_warning_min = 50.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let cfg = GaaConfig::default();
        let text = cfg.to_toml_string().unwrap();
        let back: GaaConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.oscillator.max_voices, cfg.oscillator.max_voices);
        assert_eq!(back.safety.dedup_window_sec, cfg.safety.dedup_window_sec);
    }
}
