//! WAV ingestion for file-playback mode.

use std::path::Path;

use lyric_visualiser_core::{LyricVizError, Result};

/// A fully decoded file: mono `f32` samples in `[-1, 1]`.
pub struct DecodedWav {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl DecodedWav {
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decodes a WAV file, widening integer formats and folding multi-channel
/// frames to mono by averaging.
pub fn decode_wav(path: &Path) -> Result<DecodedWav> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|err| LyricVizError::msg(format!("failed to open {}: {err}", path.display())))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| read_error(path, err))?,
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|sample| sample.map(|s| f32::from(s) / f32::from(i16::MAX)))
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| read_error(path, err))?,
        (hound::SampleFormat::Int, bits @ (24 | 32)) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|err| read_error(path, err))?
        }
        (format, bits) => {
            return Err(LyricVizError::msg(format!(
                "unsupported WAV format: {bits}-bit {format:?}"
            )));
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        samples,
    })
}

fn read_error(path: &Path, err: hound::Error) -> LyricVizError {
    LyricVizError::msg(format!("failed to decode {}: {err}", path.display()))
}
