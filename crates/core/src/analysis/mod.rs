use std::{f32::consts::PI, fmt, ops::Range, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{config::AnalyserConfig, Result};

/// Snapshot bins averaged into the bass feature.
const BASS_BINS: Range<usize> = 0..32;
/// Snapshot bins averaged into the treble feature.
const TREBLE_BINS: Range<usize> = 100..256;

/// Scalar summary of one frequency snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean of every bin magnitude in the snapshot.
    pub volume: f32,
    /// Mean magnitude of the low bins.
    pub bass: f32,
    /// Mean magnitude of the high bins.
    pub treble: f32,
}

impl FeatureVector {
    /// Derives the feature set from a snapshot of byte magnitudes.
    ///
    /// The band ranges are fixed; when a snapshot is shorter than a range,
    /// the absent bins are simply not averaged. All three features land in
    /// `[0, 255]`.
    pub fn from_bins(bins: &[u8]) -> Self {
        Self {
            volume: band_mean(bins, 0..bins.len()),
            bass: band_mean(bins, BASS_BINS),
            treble: band_mean(bins, TREBLE_BINS),
        }
    }
}

fn band_mean(bins: &[u8], band: Range<usize>) -> f32 {
    let start = band.start.min(bins.len());
    let end = band.end.min(bins.len());
    if start >= end {
        return 0.0;
    }
    let sum: u32 = bins[start..end].iter().map(|&bin| u32::from(bin)).sum();
    sum as f32 / (end - start) as f32
}

/// Frequency-domain analyser producing byte-magnitude snapshots.
///
/// Audio callbacks push raw samples into a rolling window; the render loop
/// pulls [`SpectrumAnalyser::features`] once per frame, which runs a
/// Hann-windowed forward FFT over the window, smooths each bin magnitude
/// over time and maps the configured decibel range onto byte values 0..=255.
/// The snapshot has `fft_size / 2` bins.
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    bins: Vec<u8>,
    fft: FftResources,
}

impl SpectrumAnalyser {
    /// Creates an analyser with the default 512-sample transform window.
    pub fn new() -> Self {
        Self::with_config(AnalyserConfig::default())
            .expect("default analyser configuration is valid")
    }

    /// Creates an analyser for the provided configuration.
    pub fn with_config(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;
        let mut planner = RealFftPlanner::new();
        let plan = planner.plan_fft_forward(config.fft_size);
        let fft = FftResources {
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
        };
        Ok(Self {
            window: vec![0.0; config.fft_size],
            smoothed: vec![0.0; config.bin_count()],
            bins: vec![0; config.bin_count()],
            config,
            fft,
        })
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Clears the rolling window and all smoothing state.
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.smoothed.fill(0.0);
        self.bins.fill(0);
    }

    /// Appends captured samples, keeping the most recent `fft_size` of them.
    /// An empty slice is a no-op.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let size = self.config.fft_size;
        if samples.len() >= size {
            self.window.copy_from_slice(&samples[samples.len() - size..]);
        } else {
            self.window.copy_within(samples.len().., 0);
            self.window[size - samples.len()..].copy_from_slice(samples);
        }
    }

    /// Recomputes the snapshot from the current window and derives the
    /// feature set. Called once per render tick.
    pub fn features(&mut self) -> Result<FeatureVector> {
        self.refresh_snapshot()?;
        Ok(FeatureVector::from_bins(&self.bins))
    }

    /// Byte magnitudes of the most recent snapshot.
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    fn refresh_snapshot(&mut self) -> Result<()> {
        let size = self.config.fft_size;
        for (index, value) in self.window.iter().enumerate() {
            self.fft.input[index] = *value * hann_value(index, size);
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let tau = self.config.smoothing_time_constant;
        let db_floor = self.config.min_decibels;
        let db_span = self.config.max_decibels - self.config.min_decibels;
        for (bin, out) in self.bins.iter_mut().enumerate() {
            let magnitude = self.fft.spectrum[bin].norm() / size as f32;
            let smoothed = tau * self.smoothed[bin] + (1.0 - tau) * magnitude;
            self.smoothed[bin] = smoothed;
            // Silent bins yield -inf here, which the clamp turns into 0.
            let db = 20.0 * smoothed.log10();
            let scaled = 255.0 * (db - db_floor) / db_span;
            *out = scaled.clamp(0.0, 255.0) as u8;
        }

        Ok(())
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("config", &self.config)
            .field("bins", &self.bins.len())
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * frequency * n as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn zero_snapshot_yields_zero_features() {
        let features = FeatureVector::from_bins(&[0u8; 256]);
        assert_eq!(features.volume, 0.0);
        assert_eq!(features.bass, 0.0);
        assert_eq!(features.treble, 0.0);
    }

    #[test]
    fn saturated_snapshot_yields_full_features() {
        let features = FeatureVector::from_bins(&[255u8; 256]);
        assert_eq!(features.volume, 255.0);
        assert_eq!(features.bass, 255.0);
        assert_eq!(features.treble, 255.0);
    }

    #[test]
    fn band_ranges_clamp_to_short_snapshots() {
        let mut bins = vec![0u8; 64];
        bins[..32].fill(100);
        let features = FeatureVector::from_bins(&bins);
        assert_eq!(features.bass, 100.0);
        // No bin at index 100 or beyond exists, so treble averages nothing.
        assert_eq!(features.treble, 0.0);
        assert_eq!(features.volume, 50.0);
    }

    #[test]
    fn silence_produces_an_all_zero_snapshot() {
        let mut analyser = SpectrumAnalyser::new();
        let features = analyser.features().unwrap();
        assert_eq!(features, FeatureVector::default());
        assert!(analyser.bins().iter().all(|&bin| bin == 0));
        assert_eq!(analyser.bins().len(), 256);
    }

    #[test]
    fn bass_sine_raises_bass_above_treble() {
        let mut analyser = SpectrumAnalyser::new();
        analyser.push_samples(&sine(200.0, 48_000.0, 512));
        let features = analyser.features().unwrap();
        assert!(features.volume > 0.0);
        assert!(features.bass > features.treble);
    }

    #[test]
    fn smoothing_decays_after_the_signal_stops() {
        let mut analyser = SpectrumAnalyser::new();
        analyser.push_samples(&sine(200.0, 48_000.0, 512));
        let loud = analyser.features().unwrap();

        analyser.push_samples(&vec![0.0; 512]);
        let fading = analyser.features().unwrap();
        assert!(fading.volume < loud.volume);
        assert!(fading.volume > 0.0, "temporal smoothing keeps residue");
    }

    #[test]
    fn window_keeps_only_the_most_recent_samples() {
        let mut analyser = SpectrumAnalyser::new();
        analyser.push_samples(&sine(200.0, 48_000.0, 512));
        // Two full windows of silence push every sine sample out.
        analyser.push_samples(&vec![0.0; 512]);
        analyser.push_samples(&vec![0.0; 512]);
        for _ in 0..200 {
            analyser.features().unwrap();
        }
        let settled = analyser.features().unwrap();
        assert_eq!(settled.volume, 0.0);
    }

    #[test]
    fn reset_clears_smoothing_state() {
        let mut analyser = SpectrumAnalyser::new();
        analyser.push_samples(&sine(200.0, 48_000.0, 512));
        analyser.features().unwrap();
        analyser.reset();
        let features = analyser.features().unwrap();
        assert_eq!(features, FeatureVector::default());
    }
}
