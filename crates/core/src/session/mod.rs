//! Session lifecycle: one object owning the cue store, the analysis
//! pipeline and the drawing surface, with symmetric setup and teardown.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{
    capture::{self, CaptureStream},
    config::AppConfig,
    lyrics::{self, Corpus, Cue},
    render::{ListenerId, RenderSurface, ResizeBus},
    timeline::{ActiveCueState, CueTimeline},
    AnalysisHandle, AudioEngine, Result, VisualParams,
};

type SizeSlot = Arc<Mutex<Option<(u32, u32)>>>;

/// Resources that exist only between `initialize` and `dispose`.
struct ActiveResources {
    analysis: AnalysisHandle,
    capture: Option<CaptureStream>,
    /// Whether anything is expected to feed the analyser. Capture failure
    /// with no external feeder leaves the mapper holding prior parameters.
    pipeline_active: bool,
    resize_listener: ListenerId,
}

/// The visualiser session.
///
/// `initialize` and `dispose` are safe in any order and any number of
/// times: a fresh initialization first tears down a prior instance, and
/// teardown releases each resource exactly once, even after a partial
/// setup. Dropping the session disposes it.
pub struct Visualiser {
    config: AppConfig,
    audio: AudioEngine,
    surface: Box<dyn RenderSurface>,
    resize_bus: ResizeBus,
    pending_resize: SizeSlot,
    timeline: CueTimeline,
    corpus: Corpus,
    active_cue: ActiveCueState,
    params: VisualParams,
    active: Option<ActiveResources>,
}

impl Visualiser {
    pub fn new(
        config: AppConfig,
        surface: Box<dyn RenderSurface>,
        resize_bus: ResizeBus,
    ) -> Result<Self> {
        config.validate()?;
        let audio = AudioEngine::with_config(config.analyser.clone())?;
        Ok(Self {
            config,
            audio,
            surface,
            resize_bus,
            pending_resize: SizeSlot::default(),
            timeline: CueTimeline::default(),
            corpus: Corpus::default(),
            active_cue: ActiveCueState::new(),
            params: VisualParams::default(),
            active: None,
        })
    }

    /// Starts the session: loads cues, starts analysis, attempts capture
    /// and registers for viewport-resize notifications.
    ///
    /// Cue-file and capture failures are caught here, logged, and leave the
    /// session running in a degraded mode (empty cue list, held visual
    /// parameters). Re-entrant: an already-active session is disposed
    /// first.
    pub fn initialize(&mut self) -> Result<()> {
        if self.active.is_some() {
            self.dispose();
        }

        self.load_cues();

        let analysis = self.audio.start()?;
        let capture = if self.config.audio.enable_capture {
            match capture::open_microphone(&self.config.audio, analysis.clone()) {
                Ok(stream) => Some(stream),
                Err(err) => {
                    tracing::warn!("continuing without audio capture: {err}");
                    None
                }
            }
        } else {
            None
        };
        // Without capture the embedder may still feed the analyser through
        // `analysis_handle`; only a failed capture attempt means silence.
        let pipeline_active = !self.config.audio.enable_capture || capture.is_some();

        let slot = self.pending_resize.clone();
        let resize_listener = self.resize_bus.register(move |width, height| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((width, height));
        });

        self.active = Some(ActiveResources {
            analysis,
            capture,
            pipeline_active,
            resize_listener,
        });
        tracing::info!(cues = self.timeline.len(), "visualiser session initialized");
        Ok(())
    }

    /// Stops the session: releases capture, unregisters the resize
    /// listener and clears the selection. Idempotent and safe to call on a
    /// never-initialized or partially-initialized session.
    pub fn dispose(&mut self) {
        if let Some(active) = self.active.take() {
            drop(active.capture);
            self.resize_bus.unregister(active.resize_listener);
            let _ = self.take_pending_resize();
            self.active_cue.clear();
            self.params = VisualParams::default();
            tracing::info!("visualiser session disposed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn capture_active(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| active.capture.is_some())
            .unwrap_or(false)
    }

    /// Handle for embedders that feed decoded audio instead of capturing.
    pub fn analysis_handle(&self) -> Option<AnalysisHandle> {
        self.active.as_ref().map(|active| active.analysis.clone())
    }

    pub fn timeline(&self) -> &CueTimeline {
        &self.timeline
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Currently selected cue, if any line has become active yet.
    pub fn active_cue(&self) -> Option<&Cue> {
        self.timeline.get(self.active_cue.current()?)
    }

    pub fn params(&self) -> &VisualParams {
        &self.params
    }

    /// Cue-poll cadence the embedder should drive `poll_position` at.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.lyrics.poll_interval_ms)
    }

    /// One animation tick: apply any pending viewport resize, sample the
    /// analyser when the pipeline is fed (a silent pipeline holds the
    /// previous parameters), and draw.
    pub fn render_tick(&mut self, wall_time_ms: f64) -> &VisualParams {
        let features = match &self.active {
            None => return &self.params,
            Some(active) if active.pipeline_active => {
                match active.analysis.latest_features() {
                    Ok(features) => Some(features),
                    Err(err) => {
                        tracing::debug!("no features this tick: {err}");
                        None
                    }
                }
            }
            Some(_) => None,
        };

        if let Some((width, height)) = self.take_pending_resize() {
            self.surface.resize(width, height);
        }
        if let Some(features) = features {
            self.params = VisualParams::from_features(&features, wall_time_ms);
        }
        self.surface.draw(&self.params);
        &self.params
    }

    /// Playback-position poll: selects the most recently started cue and
    /// reports it only when the selection actually changed.
    pub fn poll_position(&mut self, position: f32) -> Option<&Cue> {
        let candidate = self.timeline.active_index(position);
        if self.active_cue.supersede(candidate) {
            return self.timeline.get(self.active_cue.current()?);
        }
        None
    }

    /// Recognition event: matches the utterance against the corpus and
    /// reports the newly selected line only when the selection changed.
    pub fn on_transcript(&mut self, utterance: &str) -> Option<&Cue> {
        let matched = self.corpus.best_match(utterance);
        if self.active_cue.supersede(matched) {
            return self.timeline.get(self.active_cue.current()?);
        }
        None
    }

    fn load_cues(&mut self) {
        let cues = match &self.config.lyrics.file {
            Some(path) => match lyrics::load_lrc(path) {
                Ok(cues) => {
                    tracing::info!(
                        path = %path.display(),
                        count = cues.len(),
                        "loaded lyric cues"
                    );
                    cues
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        "cue file unavailable, continuing without cues: {err}"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.corpus = Corpus::from_cues(&cues);
        self.timeline = CueTimeline::new(cues);
    }

    fn take_pending_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for Visualiser {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Visualiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visualiser")
            .field("active", &self.active.is_some())
            .field("cues", &self.timeline.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSurface;

    /// Surface spy the test keeps a handle to after the session takes the
    /// boxed half.
    #[derive(Clone, Default)]
    struct SharedSpy(Arc<Mutex<NullSurface>>);

    impl SharedSpy {
        fn snapshot(&self) -> NullSurface {
            let spy = self.0.lock().unwrap();
            NullSurface {
                draw_count: spy.draw_count,
                last_params: spy.last_params,
                last_size: spy.last_size,
            }
        }
    }

    impl RenderSurface for SharedSpy {
        fn draw(&mut self, params: &VisualParams) {
            self.0.lock().unwrap().draw(params);
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.0.lock().unwrap().resize(width, height);
        }
    }

    fn headless_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.audio.enable_capture = false;
        config
    }

    fn session_with_cues(text: &str) -> (Visualiser, ResizeBus, SharedSpy) {
        let bus = ResizeBus::new();
        let spy = SharedSpy::default();
        let mut session =
            Visualiser::new(headless_config(), Box::new(spy.clone()), bus.clone()).unwrap();
        session.initialize().unwrap();
        // Tests inject cues directly instead of going through a file.
        session.timeline = CueTimeline::new(lyrics::parse_lrc(text));
        session.corpus = Corpus::from_cues(session.timeline.cues());
        (session, bus, spy)
    }

    #[test]
    fn lifecycle_is_reentrant_and_idempotent() {
        let bus = ResizeBus::new();
        let mut session = Visualiser::new(
            headless_config(),
            Box::new(NullSurface::new()),
            bus.clone(),
        )
        .unwrap();

        session.dispose();
        assert!(!session.is_active());

        session.initialize().unwrap();
        assert!(session.is_active());
        assert_eq!(bus.listener_count(), 1);

        // Re-initializing without an intervening dispose must not leak the
        // previous listener.
        session.initialize().unwrap();
        assert_eq!(bus.listener_count(), 1);

        session.dispose();
        session.dispose();
        assert!(!session.is_active());
        assert_eq!(bus.listener_count(), 0);

        session.initialize().unwrap();
        session.dispose();
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn drop_releases_the_listener() {
        let bus = ResizeBus::new();
        {
            let mut session = Visualiser::new(
                headless_config(),
                Box::new(NullSurface::new()),
                bus.clone(),
            )
            .unwrap();
            session.initialize().unwrap();
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn missing_cue_file_fails_soft() {
        let bus = ResizeBus::new();
        let mut config = headless_config();
        config.lyrics.file = Some("/nonexistent/lyrics/sample.lrc".into());
        let mut session =
            Visualiser::new(config, Box::new(NullSurface::new()), bus).unwrap();

        session.initialize().unwrap();
        assert!(session.timeline().is_empty());
        assert_eq!(session.poll_position(10.0), None);
        assert_eq!(session.active_cue(), None);
    }

    #[test]
    fn poll_reports_transitions_only() {
        let (mut session, _bus, _spy) =
            session_with_cues("[00:01]first\n[00:05]second");

        assert_eq!(session.poll_position(0.5), None);
        assert_eq!(session.poll_position(1.2).unwrap().text, "first");
        assert_eq!(session.poll_position(1.4), None, "same cue stays quiet");
        assert_eq!(session.poll_position(5.0).unwrap().text, "second");
        // Seeking backwards reverts and re-fires.
        assert_eq!(session.poll_position(1.2).unwrap().text, "first");
        // Before the first cue nothing qualifies; the last line stays.
        assert_eq!(session.poll_position(0.1), None);
        assert_eq!(session.active_cue().unwrap().text, "first");
    }

    #[test]
    fn transcript_and_poll_share_one_selection() {
        let (mut session, _bus, _spy) =
            session_with_cues("[00:01]가나다\n[00:05]다라마");

        assert_eq!(session.on_transcript("라마").unwrap().text, "다라마");
        // The poll path sees the same selection and stays quiet until the
        // position actually changes the cue.
        assert_eq!(session.poll_position(6.0), None);
        assert_eq!(session.poll_position(1.5).unwrap().text, "가나다");
        // First containing line wins; it is already selected.
        assert_eq!(session.on_transcript("나다"), None);
        assert_eq!(session.on_transcript("없는 가사"), None);
        assert_eq!(session.active_cue().unwrap().text, "가나다");
    }

    #[test]
    fn render_tick_draws_and_maps_fed_samples() {
        let (mut session, _bus, spy) = session_with_cues("");

        session.render_tick(0.0);
        assert_eq!(spy.snapshot().draw_count, 1);
        assert_eq!(spy.snapshot().last_params, Some(VisualParams::default()));

        let handle = session.analysis_handle().unwrap();
        handle.push_samples(&[0.5_f32; 512]).unwrap();
        let params = *session.render_tick(1_000.0);
        assert!(params.scale > 1.0);
        assert_eq!(params.rotation, 2.0);
        assert_eq!(spy.snapshot().draw_count, 2);
    }

    #[test]
    fn render_tick_is_inert_after_dispose() {
        let (mut session, _bus, spy) = session_with_cues("");
        session.render_tick(0.0);
        session.dispose();
        session.render_tick(16.0);
        assert_eq!(spy.snapshot().draw_count, 1);
    }

    #[test]
    fn resize_events_reach_the_surface_on_the_next_tick() {
        let (mut session, bus, spy) = session_with_cues("");

        bus.notify(800, 600);
        assert_eq!(spy.snapshot().last_size, None, "applied on tick, not inline");
        session.render_tick(0.0);
        assert_eq!(spy.snapshot().last_size, Some((800, 600)));

        session.dispose();
        bus.notify(100, 100);
        session.initialize().unwrap();
        session.render_tick(0.0);
        // The notification between sessions went to no listener.
        assert_eq!(spy.snapshot().last_size, Some((800, 600)));
    }
}
