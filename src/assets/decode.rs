use std::io::Cursor;

use anyhow::Context;

use crate::foundation::error::{ReelError, ReelResult};
use crate::render::raster::Raster;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` samples in `[-1, 1]`.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Silent buffer of `frames` sample frames.
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> ReelResult<Raster> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(Raster::from_rgba_image(dyn_img.to_rgba8()))
}

/// Decode WAV bytes (integer or float PCM) to interleaved `f32`.
pub fn decode_wav(bytes: &[u8]) -> ReelResult<AudioPcm> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("parse wav header")?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(ReelError::asset("wav has zero channels or sample rate"));
    }
    let interleaved_f32 = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("read f32 wav samples")?,
        hound::SampleFormat::Int => {
            let bits = u32::from(spec.bits_per_sample);
            if bits == 0 || bits > 32 {
                return Err(ReelError::asset(format!(
                    "unsupported wav bit depth {bits}"
                )));
            }
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .context("read integer wav samples")?
        }
    };
    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
