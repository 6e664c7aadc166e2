use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::audio::manifest::{AudioManifest, AudioSegment, Layer};
use crate::foundation::core::Fps;
use crate::foundation::error::ReelResult;
use crate::foundation::math::db_to_gain;

/// Rendered episode audio, interleaved `f32` in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudio {
    /// Sample rate.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved samples.
    pub samples: Vec<f32>,
}

impl MixedAudio {
    /// Sample frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Root-mean-square level over sample frames `[start, end)`, all channels.
    pub fn rms(&self, start: usize, end: usize) -> f32 {
        let ch = usize::from(self.channels.max(1));
        let end = end.min(self.frames());
        if end <= start {
            return 0.0;
        }
        let slice = &self.samples[start * ch..end * ch];
        let sum: f64 = slice.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum / slice.len() as f64).sqrt() as f32
    }

    /// Write raw little-endian `f32` PCM, the format the encoder reads.
    pub fn write_f32le(&self, out_path: &Path) -> ReelResult<()> {
        write_mix_to_f32le_file(&self.samples, out_path)
    }

    /// Write a 32-bit float WAV file.
    pub fn write_wav(&self, out_path: &Path) -> ReelResult<()> {
        ensure_parent(out_path)?;
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(out_path, spec)
            .with_context(|| format!("create wav '{}'", out_path.display()))?;
        for &s in &self.samples {
            writer
                .write_sample(s)
                .with_context(|| format!("write wav '{}'", out_path.display()))?;
        }
        writer
            .finalize()
            .with_context(|| format!("finalize wav '{}'", out_path.display()))?;
        Ok(())
    }
}

/// Mix all manifest segments into interleaved output PCM.
#[tracing::instrument(skip(manifest), fields(segments = manifest.segments.len()))]
pub fn mix_manifest(manifest: &AudioManifest) -> MixedAudio {
    let frames = manifest.total_samples as usize;
    let mut out = vec![0.0f32; frames * usize::from(manifest.channels)];

    for seg in &manifest.segments {
        mix_segment(&mut out, manifest, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    MixedAudio {
        sample_rate: manifest.sample_rate,
        channels: manifest.channels,
        samples: out,
    }
}

fn mix_segment(out: &mut [f32], manifest: &AudioManifest, seg: &AudioSegment) {
    let seg_len_samples = seg
        .timeline_end_sample
        .saturating_sub(seg.timeline_start_sample);
    if seg_len_samples == 0 || manifest.channels == 0 {
        return;
    }

    let src_channels = usize::from(seg.source.channels.max(1));
    let src = seg.source.interleaved_f32.as_slice();
    let src_frames = src.len() / src_channels;
    if src_frames == 0 {
        return;
    }

    // Music gain is carried by the ducking curve rather than the segment volume.
    let baseline = db_to_gain(manifest.music_gain_db);
    let out_channels = usize::from(manifest.channels);

    for dst_sample in seg.timeline_start_sample..seg.timeline_end_sample {
        let dst_idx = dst_sample as usize * out_channels;
        if dst_idx + out_channels > out.len() {
            break;
        }
        let rel_sample = dst_sample - seg.timeline_start_sample;
        let rel_sec = (rel_sample as f64) / f64::from(manifest.sample_rate);

        let src_sec = seg.source_start_sec + rel_sec;
        let src_pos = src_sec * f64::from(seg.source.sample_rate);
        if !src_pos.is_finite() || src_pos < 0.0 {
            break;
        }
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let mut gain = fade_gain(seg, rel_sec, seg_len_samples, manifest.sample_rate) * seg.volume;
        if seg.layer == Layer::Music {
            let t = dst_sample as f64 / f64::from(manifest.sample_rate);
            let ducked = db_to_gain(manifest.music_gain_db_at(t));
            gain = if baseline > 0.0 {
                gain * ducked / baseline
            } else {
                0.0
            };
        }

        let (l, r) = if src_channels == 1 {
            let v0 = src[src_frame0];
            let v1 = src[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * src_channels;
            let i1 = src_frame1 * src_channels;
            let (l0, l1) = (src[i0], src[i1]);
            let (r0, r1) = (src[i0 + 1], src[i1 + 1]);
            (l0 + ((l1 - l0) * frac), r0 + ((r1 - r0) * frac))
        };

        if out_channels == 1 {
            out[dst_idx] += 0.5 * (l + r) * gain;
        } else {
            out[dst_idx] += l * gain;
            out[dst_idx + 1] += r * gain;
        }
    }
}

fn fade_gain(seg: &AudioSegment, rel_sec: f64, seg_len_samples: u64, sample_rate: u32) -> f32 {
    let mut gain = 1.0f32;
    if seg.fade_in_sec > 0.0 {
        let t = (rel_sec / seg.fade_in_sec).clamp(0.0, 1.0) as f32;
        gain *= t;
    }
    if seg.fade_out_sec > 0.0 {
        let seg_len_sec = (seg_len_samples as f64) / f64::from(sample_rate);
        let rem = (seg_len_sec - rel_sec).max(0.0);
        let t = (rem / seg.fade_out_sec).clamp(0.0, 1.0) as f32;
        gain *= t;
    }
    gain
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    ensure_parent(out_path)?;
    let file = std::fs::File::create(out_path)
        .with_context(|| format!("create audio mix '{}'", out_path.display()))?;
    let mut w = std::io::BufWriter::new(file);
    for &sample in samples_interleaved {
        w.write_all(&sample.to_le_bytes())
            .with_context(|| format!("write audio mix '{}'", out_path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flush audio mix '{}'", out_path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create audio output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num.max(1));
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
