//! Core library for the Lyric Visualiser application.
//!
//! The crate turns two inputs, a stream of audio samples and a sheet of
//! timestamped lyric lines, into the state a renderer needs each frame: a
//! small set of visual parameters derived from the current spectrum, and
//! the lyric line that playback (or speech recognition) has most recently
//! reached. Each module owns a distinct subsystem: `lyrics` parses cue
//! sheets and matches transcripts, `timeline` tracks the active cue,
//! `analysis` produces byte-magnitude spectra, `mapping` folds spectrum
//! features into draw parameters, and `session` ties them to a
//! [`render::RenderSurface`] with symmetric setup and teardown.

pub mod analysis;
pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod lyrics;
pub mod mapping;
pub mod render;
pub mod session;
pub mod timeline;

pub use analysis::{FeatureVector, SpectrumAnalyser};
pub use audio::{AnalysisHandle, AudioEngine};
pub use capture::{open_microphone, CaptureStream};
pub use config::{AnalyserConfig, AppConfig, AudioConfig, LyricsConfig};
pub use error::{LyricVizError, Result};
pub use lyrics::{load_lrc, parse_lrc, Corpus, Cue};
pub use mapping::VisualParams;
pub use render::{ListenerId, NullSurface, RenderSurface, ResizeBus};
pub use session::Visualiser;
pub use timeline::{ActiveCueState, CueTimeline, PlaybackClock};
