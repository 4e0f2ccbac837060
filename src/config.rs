//! Configuration management for the metronome engine
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling parameter tuning without recompilation. Cycle sizing, tick
//! length, tempo bounds, sine voice frequencies and light capacities can all
//! be adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub metronome: MetronomeConfig,
    pub visual: VisualConfig,
}

/// Audio generation and device parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames per generated output cycle; one second of audio by default.
    /// Smaller cycles lower reconfiguration latency but must stay well ahead
    /// of device consumption.
    pub cycle_frames: usize,
    /// Length of one click burst in frames
    pub tick_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            cycle_frames: 48_000,
            tick_frames: 3_000,
        }
    }
}

/// Tempo bounds, default transport state and tone voices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetronomeConfig {
    /// Lower tempo clamp in BPM
    pub min_tempo: u32,
    /// Upper tempo clamp in BPM
    pub max_tempo: u32,
    /// Tempo applied at construction
    pub default_tempo: u32,
    /// Volume applied at construction (0-100)
    pub default_volume: u32,
    /// Sine voice for the accented beat, in Hz
    pub beat_frequency_hz: f64,
    /// Sine voice for the regular tick, in Hz
    pub tick_frequency_hz: f64,
    /// Sine voice for subdivisions, in Hz
    pub subdivision_frequency_hz: f64,
    /// Gap after which a tap series is considered abandoned, in ms
    pub tap_timeout_ms: u64,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            min_tempo: 1,
            max_tempo: 300,
            default_tempo: 120,
            default_volume: 100,
            beat_frequency_hz: 3_000.0,
            tick_frequency_hz: 10_000.0,
            subdivision_frequency_hz: 7_000.0,
            tap_timeout_ms: 3_000,
        }
    }
}

/// Visual pulse scheduler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    /// Light capacity on narrow screens (< 600 dp wide)
    pub narrow_screen_lights: usize,
    /// Light capacity on wide screens
    pub wide_screen_lights: usize,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            narrow_screen_lights: 4,
            wide_screen_lights: 8,
        }
    }
}

impl Default for EngineConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            metronome: MetronomeConfig::default(),
            visual: VisualConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults (with a logged warning) when the
    /// file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Clamp a requested tempo to the configured bounds
    pub fn clamp_tempo(&self, bpm: u32) -> u32 {
        bpm.clamp(self.metronome.min_tempo, self.metronome.max_tempo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.cycle_frames, 48_000);
        assert_eq!(config.audio.tick_frames, 3_000);
        assert_eq!(config.metronome.max_tempo, 300);
        assert_eq!(config.metronome.min_tempo, 1);
        assert_eq!(config.visual.narrow_screen_lights, 4);
        assert_eq!(config.visual.wide_screen_lights, 8);
    }

    #[test]
    fn test_clamp_tempo() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_tempo(0), 1);
        assert_eq!(config.clamp_tempo(120), 120);
        assert_eq!(config.clamp_tempo(500), 300);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.audio.sample_rate, config.audio.sample_rate);
        assert_eq!(parsed.metronome.max_tempo, config.metronome.max_tempo);
        assert_eq!(
            parsed.metronome.beat_frequency_hz,
            config.metronome.beat_frequency_hz
        );
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_file("/nonexistent/beater.json");
        assert_eq!(config.audio.sample_rate, 48_000);
    }
}
