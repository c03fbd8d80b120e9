use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LyricVizError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub analyser: AnalyserConfig,
    pub lyrics: LyricsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            analyser: AnalyserConfig::default(),
            lyrics: LyricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads and validates a JSON configuration file. Fields missing from
    /// the file keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|err| LyricVizError::msg(format!("invalid configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.analyser.validate()
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    /// When false the session never opens a capture device and expects the
    /// embedder to feed decoded samples itself.
    pub enable_capture: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
            enable_capture: true,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(LyricVizError::InvalidInput("sample rate must be non-zero"));
        }
        if self.block_size == 0 {
            return Err(LyricVizError::InvalidInput("block size must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration for the spectrum analyser.
///
/// The defaults reproduce the analyser the visualiser was tuned against: a
/// 512-sample transform window (256 frequency bins), temporal smoothing of
/// 0.8 and a -100..-30 dB range mapped onto byte magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Transform window size in samples. Must be a power of two.
    pub fft_size: usize,
    /// Per-bin temporal smoothing factor in `[0, 1)`; 0 disables smoothing.
    pub smoothing_time_constant: f32,
    /// Magnitude mapped to byte value 0.
    pub min_decibels: f32,
    /// Magnitude mapped to byte value 255.
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins a snapshot carries.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 2 {
            return Err(LyricVizError::InvalidInput(
                "transform window must be a power of two of at least 2",
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(LyricVizError::InvalidInput(
                "smoothing time constant must lie in [0, 1)",
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(LyricVizError::InvalidInput(
                "min decibels must be below max decibels",
            ));
        }
        Ok(())
    }
}

/// Configuration for cue loading and playback polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Timed-lyric file to load on initialization. `None` starts the
    /// session with an empty cue list.
    pub file: Option<PathBuf>,
    /// Interval between playback-position polls.
    pub poll_interval_ms: u64,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            file: None,
            poll_interval_ms: 300,
        }
    }
}
