//! Microphone capture feeding the analysis pipeline.
//!
//! Everything here returns honest errors; the fail-soft policy (log and
//! keep visualising without features) belongs to the session boundary.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use crate::{audio::AnalysisHandle, config::AudioConfig, LyricVizError, Result};

/// Owns a running input stream. Dropping it stops capture.
pub struct CaptureStream {
    device_name: String,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl CaptureStream {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Rate the device actually delivers, which may differ from the
    /// configured engine rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("device_name", &self.device_name)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Opens the default input device and forwards mono-folded samples into the
/// shared analyser.
pub fn open_microphone(config: &AudioConfig, handle: AnalysisHandle) -> Result<CaptureStream> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        LyricVizError::CaptureUnavailable("no default input device".to_string())
    })?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device.default_input_config().map_err(|err| {
        LyricVizError::CaptureUnavailable(format!("failed to query input config: {err}"))
    })?;
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    if sample_rate != config.sample_rate {
        tracing::debug!(
            device_rate = sample_rate,
            configured = config.sample_rate,
            "input device rate differs from configured engine rate"
        );
    }

    let stream = match sample_format {
        SampleFormat::F32 => build_input_stream::<f32>(&device, &stream_config, handle, |s| s),
        SampleFormat::I16 => build_input_stream::<i16>(&device, &stream_config, handle, |s| {
            s as f32 / i16::MAX as f32
        }),
        SampleFormat::U16 => build_input_stream::<u16>(&device, &stream_config, handle, |s| {
            (s as f32 - u16::MAX as f32 / 2.0) / (u16::MAX as f32 / 2.0)
        }),
        other => {
            return Err(LyricVizError::UnsupportedCapability(format!(
                "input sample format {other:?} is not supported"
            )))
        }
    }
    .map_err(|err| LyricVizError::CaptureUnavailable(format!("failed to build stream: {err}")))?;

    stream
        .play()
        .map_err(|err| LyricVizError::CaptureUnavailable(format!("failed to start stream: {err}")))?;

    tracing::info!(device = %device_name, sample_rate, "microphone capture started");

    Ok(CaptureStream {
        device_name,
        sample_rate,
        _stream: stream,
    })
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    handle: AnalysisHandle,
    convert: impl Fn(T) -> f32 + Send + 'static,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
{
    let channels = (config.channels as usize).max(1);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Fold interleaved frames to mono by averaging the channels.
            let mut mono = Vec::with_capacity(data.len() / channels);
            for frame in data.chunks_exact(channels) {
                let sum: f32 = frame.iter().map(|&sample| convert(sample)).sum();
                mono.push(sum / channels as f32);
            }
            let _ = handle.push_samples(&mono);
        },
        |err| tracing::error!("audio capture stream error: {err}"),
        None,
    )
}
