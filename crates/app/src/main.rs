use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use lyric_visualiser_core::{
    AppConfig, LyricVizError, PlaybackClock, RenderSurface, ResizeBus, VisualParams, Visualiser,
};
use tracing_subscriber::EnvFilter;

mod wav;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> lyric_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Live { lyrics, config } => run_live(lyrics, config),
        Commands::Play {
            audio,
            lyrics,
            config,
            seek,
        } => run_play(&audio, lyrics, config, seek),
    }
}

/// Microphone mode: the analyser follows the capture device while typed
/// lines stand in for a speech-recognition feed. Exits when stdin closes.
fn run_live(
    lyrics: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> lyric_visualiser_core::Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if lyrics.is_some() {
        config.lyrics.file = lyrics;
    }

    let mut session = Visualiser::new(config, Box::new(LogSurface::default()), ResizeBus::new())?;
    session.initialize()?;
    if !session.capture_active() {
        tracing::warn!("no capture device; visuals will hold their idle state");
    }
    tracing::info!(
        cues = session.timeline().len(),
        "live mode started; type a lyric fragment and press enter to match it"
    );

    let transcripts = spawn_stdin_reader();
    let started = Instant::now();
    loop {
        session.render_tick(started.elapsed().as_secs_f64() * 1000.0);

        match transcripts.try_recv() {
            Ok(utterance) => {
                let line = utterance.trim();
                if !line.is_empty() {
                    match session.on_transcript(line) {
                        Some(cue) => println!("{cue}"),
                        None => tracing::debug!(utterance = line, "no new match"),
                    }
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        thread::sleep(FRAME_INTERVAL);
    }

    session.dispose();
    Ok(())
}

/// File mode: decodes a WAV, feeds it to the analyser in real time and
/// prints each lyric line as playback reaches its timestamp.
fn run_play(
    audio: &Path,
    lyrics: Option<PathBuf>,
    config_path: Option<PathBuf>,
    seek: Option<f32>,
) -> lyric_visualiser_core::Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if lyrics.is_some() {
        config.lyrics.file = lyrics;
    }
    // File playback feeds the analyser itself.
    config.audio.enable_capture = false;

    let decoded = wav::decode_wav(audio)?;
    tracing::info!(
        path = %audio.display(),
        sample_rate = decoded.sample_rate,
        seconds = decoded.duration_seconds(),
        "decoded audio"
    );

    let mut session = Visualiser::new(config, Box::new(LogSurface::default()), ResizeBus::new())?;
    session.initialize()?;
    let analysis = session
        .analysis_handle()
        .ok_or_else(|| LyricVizError::msg("session exposed no analysis handle"))?;

    let mut clock = PlaybackClock::default();
    if let Some(seconds) = seek {
        clock.seek(seconds);
    }

    let poll_interval = session.poll_interval();
    let duration = decoded.duration_seconds();
    let rate = decoded.sample_rate as f32;
    let mut fed = ((clock.time_seconds * rate) as usize).min(decoded.samples.len());
    let started = Instant::now();
    let mut last_tick = started;
    let mut last_poll: Option<Instant> = None;

    while clock.time_seconds <= duration {
        let now = Instant::now();
        clock.advance(now.duration_since(last_tick).as_secs_f32());
        last_tick = now;

        let cursor = ((clock.time_seconds * rate) as usize).min(decoded.samples.len());
        if cursor > fed {
            analysis.push_samples(&decoded.samples[fed..cursor])?;
            fed = cursor;
        }

        session.render_tick(started.elapsed().as_secs_f64() * 1000.0);

        if last_poll.map_or(true, |at| now.duration_since(at) >= poll_interval) {
            last_poll = Some(now);
            if let Some(cue) = session.poll_position(clock.time_seconds) {
                println!("{cue}");
            }
        }

        thread::sleep(FRAME_INTERVAL);
    }

    tracing::info!("playback finished");
    session.dispose();
    Ok(())
}

fn load_config(path: Option<&Path>) -> lyric_visualiser_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Render boundary for a terminal process: draws become periodic log lines
/// instead of geometry updates.
#[derive(Debug, Default)]
struct LogSurface {
    frames: usize,
}

impl RenderSurface for LogSurface {
    fn draw(&mut self, params: &VisualParams) {
        // One line per second at the 60 fps tick rate.
        if self.frames % 60 == 0 {
            tracing::info!(
                scale = params.scale,
                rotation = params.rotation,
                red = params.color[0],
                green = params.color[1],
                blue = params.color[2],
                "frame"
            );
        }
        self.frames += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "viewport resized");
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive lyric visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Visualise live microphone input and match typed transcripts.
    Live {
        /// Timed lyric sheet (.lrc) to match against.
        #[arg(short, long)]
        lyrics: Option<PathBuf>,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Play a WAV file through the analyser and print lyrics on cue.
    Play {
        /// Path to the WAV file to play.
        audio: PathBuf,
        /// Timed lyric sheet (.lrc) to display.
        #[arg(short, long)]
        lyrics: Option<PathBuf>,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Start position in seconds.
        #[arg(short, long)]
        seek: Option<f32>,
    },
}
