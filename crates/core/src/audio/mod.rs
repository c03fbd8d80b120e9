use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::AnalyserConfig, FeatureVector, LyricVizError, Result, SpectrumAnalyser,
};

/// High level audio engine façade.
///
/// Owns the shared spectrum analyser that the capture callback feeds and
/// the render loop samples. Either side holds an [`AnalysisHandle`]; the
/// engine itself stays with the session that created it.
#[derive(Debug)]
pub struct AudioEngine {
    config: AnalyserConfig,
    analyser: Arc<Mutex<SpectrumAnalyser>>,
}

impl AudioEngine {
    /// Creates an engine with the default analyser configuration.
    pub fn new() -> Self {
        Self {
            config: AnalyserConfig::default(),
            analyser: Arc::new(Mutex::new(SpectrumAnalyser::new())),
        }
    }

    /// Creates an engine using an explicit analyser configuration.
    pub fn with_config(config: AnalyserConfig) -> Result<Self> {
        let analyser = SpectrumAnalyser::with_config(config.clone())?;
        Ok(Self {
            config,
            analyser: Arc::new(Mutex::new(analyser)),
        })
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Starts (or restarts) analysis and returns a handle to the pipeline.
    ///
    /// The analyser is rebuilt when its configuration changed since the
    /// last start and merely cleared otherwise, so a restarted session
    /// never sees stale smoothing state.
    pub fn start(&self) -> Result<AnalysisHandle> {
        {
            let mut analyser = self.lock_analyser()?;
            if analyser.config() != &self.config {
                *analyser = SpectrumAnalyser::with_config(self.config.clone())?;
            } else {
                analyser.reset();
            }
        }

        Ok(AnalysisHandle::new(self.analyser.clone()))
    }

    /// Feeds a block of floating point samples into the analyser. Live
    /// capture calls this repeatedly; file playback injects decoded spans.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut analyser = self.lock_analyser()?;
        analyser.push_samples(samples);
        Ok(())
    }

    fn lock_analyser(&self) -> Result<MutexGuard<'_, SpectrumAnalyser>> {
        self.analyser
            .lock()
            .map_err(|_| LyricVizError::msg("analysis pipeline has been poisoned"))
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, thread-safe view over the analyser managed by [`AudioEngine`].
#[derive(Clone)]
pub struct AnalysisHandle {
    shared: Arc<Mutex<SpectrumAnalyser>>,
}

impl AnalysisHandle {
    pub(crate) fn new(shared: Arc<Mutex<SpectrumAnalyser>>) -> Self {
        Self { shared }
    }

    /// Appends captured samples to the rolling analysis window.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        let mut analyser = self.lock()?;
        analyser.push_samples(samples);
        Ok(())
    }

    /// Recomputes and returns the current feature set. Pulled once per
    /// render tick.
    pub fn latest_features(&self) -> Result<FeatureVector> {
        let mut analyser = self.lock()?;
        analyser.features()
    }

    /// Byte magnitudes of the most recent snapshot, for consumers that
    /// draw the spectrum itself.
    pub fn snapshot_bins(&self) -> Result<Vec<u8>> {
        let analyser = self.lock()?;
        Ok(analyser.bins().to_vec())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SpectrumAnalyser>> {
        self.shared
            .lock()
            .map_err(|_| LyricVizError::msg("analysis pipeline has been poisoned"))
    }
}

impl std::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle").finish()
    }
}
