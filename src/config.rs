//! Player configuration
//!
//! Loaded from JSON; every field is optional and falls back to its default.
//!
//! ```json
//! { "sample_rate": 48000, "buffer_frames": 1024, "imf_rate": 700.0 }
//! ```

use crate::formats::{DecodeOptions, DEFAULT_IMF_RATE};
use crate::{Opl3Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default output sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default buffer size in stereo frames (~46ms at 44.1 kHz)
pub const DEFAULT_BUFFER_FRAMES: usize = 2048;

/// Playback and decoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Stereo frames per audio buffer
    pub buffer_frames: usize,
    /// Command rate assumed for IMF files
    pub imf_rate: f64,
    /// Extra passes over a VGM loop region (`None` = one)
    pub vgm_loop_repeat: Option<u32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            imf_rate: DEFAULT_IMF_RATE,
            vgm_loop_repeat: None,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| Opl3Error::ConfigError(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Opl3Error::ConfigError(format!("serialization failed: {}", e)))
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Opl3Error::ConfigError(
                "sample_rate must be greater than zero".into(),
            ));
        }
        if self.buffer_frames == 0 {
            return Err(Opl3Error::ConfigError(
                "buffer_frames must be greater than zero".into(),
            ));
        }
        if !(self.imf_rate.is_finite() && self.imf_rate > 0.0) {
            return Err(Opl3Error::ConfigError(format!(
                "imf_rate must be a positive number, got {}",
                self.imf_rate
            )));
        }
        Ok(())
    }

    /// Decoder settings derived from this configuration
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            imf_rate: self.imf_rate,
            vgm_loop_repeat: self.vgm_loop_repeat,
        }
    }

    /// Buffer duration in milliseconds
    pub fn latency_ms(&self) -> f64 {
        self.buffer_frames as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.buffer_frames, 2048);
        assert_eq!(config.imf_rate, 560.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.decode_options(), DecodeOptions::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlayerConfig::from_json(r#"{ "imf_rate": 700.0, "vgm_loop_repeat": 2 }"#)
            .unwrap();
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.imf_rate, 700.0);
        assert_eq!(config.decode_options().vgm_loop_repeat, Some(2));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "sample_rate": 0 }"#),
            Err(Opl3Error::ConfigError(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "buffer_frames": 0 }"#),
            Err(Opl3Error::ConfigError(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "imf_rate": -1.0 }"#),
            Err(Opl3Error::ConfigError(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json("not json"),
            Err(Opl3Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PlayerConfig {
            sample_rate: 48_000,
            buffer_frames: 512,
            imf_rate: 700.0,
            vgm_loop_repeat: Some(0),
        };
        let parsed = PlayerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_latency() {
        let config = PlayerConfig {
            buffer_frames: 441,
            ..PlayerConfig::default()
        };
        assert_relative_eq!(config.latency_ms(), 10.0);
    }
}
