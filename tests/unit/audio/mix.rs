use super::*;
use crate::assets::decode::AudioPcm;
use crate::audio::ducking::DuckingEnvelope;
use std::sync::Arc;

fn constant(sample_rate: u32, channels: u16, frames: usize, value: f32) -> Arc<AudioPcm> {
    Arc::new(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32: vec![value; frames * usize::from(channels)],
    })
}

fn segment(layer: Layer, source: Arc<AudioPcm>, start: u64, end: u64) -> AudioSegment {
    AudioSegment {
        layer,
        identifier: "t".to_string(),
        timeline_start_sample: start,
        timeline_end_sample: end,
        source_start_sec: 0.0,
        volume: 1.0,
        fade_in_sec: 0.0,
        fade_out_sec: 0.0,
        source,
    }
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    // 30000/1001 ~ 29.97
    let fps = Fps {
        num: 30_000,
        den: 1001,
    };
    assert_eq!(frame_to_sample(0, fps, 48_000), 0);
    assert_eq!(frame_to_sample(30_000, fps, 48_000), 48_048_000);
    assert_eq!(frame_to_sample(30, Fps { num: 30, den: 1 }, 48_000), 48_000);
}

#[test]
fn mix_applies_fade_in() {
    let mut seg = segment(Layer::Sfx, constant(48_000, 2, 48_000, 1.0), 0, 48_000);
    seg.fade_in_sec = 1.0;
    let manifest = AudioManifest {
        sample_rate: 48_000,
        channels: 2,
        total_samples: 48_000,
        music_gain_db: 0.0,
        ducking: None,
        segments: vec![seg],
    };
    let out = mix_manifest(&manifest);
    // First sample is faded in (gain 0), last sample is ~1.0.
    assert!(out.samples[0].abs() < 1e-6);
    assert!(out.samples[out.samples.len() - 2] > 0.5);
}

#[test]
fn music_is_ducked_inside_dialogue() {
    let manifest = AudioManifest {
        sample_rate: 1_000,
        channels: 1,
        total_samples: 1_000,
        music_gain_db: -20.0,
        ducking: Some(DuckingEnvelope::new(&[(0.5, 1.0)], -6.0, 0.0)),
        segments: vec![AudioSegment {
            volume: db_to_gain(-20.0),
            ..segment(Layer::Music, constant(1_000, 1, 1_000, 1.0), 0, 1_000)
        }],
    };
    let out = mix_manifest(&manifest);
    assert!((out.samples[100] - db_to_gain(-20.0)).abs() < 1e-5);
    assert!((out.samples[750] - db_to_gain(-26.0)).abs() < 1e-5);
}

#[test]
fn sums_are_clamped() {
    let loud = constant(1_000, 1, 100, 0.8);
    let manifest = AudioManifest {
        sample_rate: 1_000,
        channels: 2,
        total_samples: 100,
        music_gain_db: 0.0,
        ducking: None,
        segments: vec![
            segment(Layer::Sfx, loud.clone(), 0, 100),
            segment(Layer::Blip, loud, 0, 100),
        ],
    };
    let out = mix_manifest(&manifest);
    assert_eq!(out.peak(), 1.0);
    assert_eq!(out.frames(), 100);
    assert!((out.duration_secs() - 0.1).abs() < 1e-12);
}

#[test]
fn mono_source_resamples_into_stereo_output() {
    let manifest = AudioManifest {
        sample_rate: 48_000,
        channels: 2,
        total_samples: 48_000,
        music_gain_db: 0.0,
        ducking: None,
        segments: vec![segment(Layer::Sfx, constant(24_000, 1, 12_000, 0.5), 0, 24_000)],
    };
    let out = mix_manifest(&manifest);
    assert!((out.samples[2 * 1_000] - 0.5).abs() < 1e-6);
    assert!((out.samples[2 * 1_000 + 1] - 0.5).abs() < 1e-6);
    assert!((out.rms(0, 20_000) - 0.5).abs() < 1e-4);
    assert_eq!(out.rms(30_000, 48_000), 0.0);
}

#[test]
fn f32le_and_wav_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mixed = MixedAudio {
        sample_rate: 8_000,
        channels: 2,
        samples: vec![0.25, -0.25, 0.5, -0.5],
    };
    let raw = dir.path().join("nested/mix.f32le");
    mixed.write_f32le(&raw).unwrap();
    let bytes = std::fs::read(&raw).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..4], &0.25f32.to_le_bytes());

    let wav = dir.path().join("mix.wav");
    mixed.write_wav(&wav).unwrap();
    let mut reader = hound::WavReader::open(&wav).unwrap();
    assert_eq!(reader.spec().channels, 2);
    let back: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(back, mixed.samples);
}
