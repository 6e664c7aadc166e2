use std::sync::Arc;

use crate::assets::decode::AudioPcm;
use crate::assets::store::AssetStore;
use crate::audio::ducking::DuckingEnvelope;
use crate::audio::mix::frame_to_sample;
use crate::config::AudioConfig;
use crate::foundation::math::db_to_gain;
use crate::script::cast::CharacterCatalog;
use crate::script::model::Script;
use crate::script::timing::EpisodeTiming;

/// Mix layer a segment belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Looped music bed, subject to ducking.
    Music,
    /// One-shot sound effect.
    Sfx,
    /// Typewriter blip.
    Blip,
}

/// One scheduled contribution in output sample space.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// Layer.
    pub layer: Layer,
    /// Identifier as authored, for diagnostics.
    pub identifier: String,
    /// First output sample frame.
    pub timeline_start_sample: u64,
    /// One past the last output sample frame.
    pub timeline_end_sample: u64,
    /// Source offset at `timeline_start_sample`.
    pub source_start_sec: f64,
    /// Linear gain.
    pub volume: f32,
    /// Linear fade-in length.
    pub fade_in_sec: f64,
    /// Linear fade-out length.
    pub fade_out_sec: f64,
    /// Decoded source.
    pub source: Arc<AudioPcm>,
}

/// Everything needed to render the episode's audio track.
#[derive(Clone, Debug)]
pub struct AudioManifest {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Output channels.
    pub channels: u16,
    /// Output length in sample frames.
    pub total_samples: u64,
    /// Baseline music gain in dB.
    pub music_gain_db: f32,
    /// Dialogue ducking for the music layer.
    pub ducking: Option<DuckingEnvelope>,
    /// Scheduled segments.
    pub segments: Vec<AudioSegment>,
}

impl AudioManifest {
    /// Effective music gain in dB at `t` seconds: baseline plus any ducking offset.
    pub fn music_gain_db_at(&self, t: f64) -> f32 {
        self.music_gain_db + self.ducking.as_ref().map_or(0.0, |d| d.offset_db_at(t))
    }

    /// Output duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_samples as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Segments of one layer.
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &AudioSegment> {
        self.segments.iter().filter(move |s| s.layer == layer)
    }
}

/// Schedule music, sound effects, and blips for a planned episode.
///
/// Missing sources are skipped; the asset store has already recorded a warning for each, so the
/// layer simply stays silent.
#[tracing::instrument(skip_all, fields(music = music_file))]
pub fn build_manifest(
    script: &Script,
    timing: &EpisodeTiming,
    assets: &AssetStore,
    cast: &CharacterCatalog,
    cfg: &AudioConfig,
    music_file: &str,
) -> AudioManifest {
    let sr = cfg.sample_rate;
    let fps = timing.fps;
    let total_samples = frame_to_sample(timing.total_frames(), fps, sr);
    let mut segments = Vec::new();

    if let Some(music) = assets.load_music(music_file) {
        schedule_music(&mut segments, music, music_file, total_samples, sr, cfg);
    }

    let sfx_gain = db_to_gain(cfg.sfx_gain_db);
    let blip_gain = db_to_gain(cfg.blip_gain_db);
    let every = cfg.blip_every.max(1);

    for ((scene, st), &scene_start) in script
        .scenes
        .iter()
        .zip(&timing.scenes)
        .zip(&timing.scene_starts)
    {
        for trigger in &scene.sfx_triggers {
            let start = match trigger.dialogue_anchor().and_then(|i| st.lines.get(i)) {
                Some(line) => frame_to_sample(scene_start + line.start_frame, fps, sr),
                None => {
                    let ms = trigger.time_ms.unwrap_or(0);
                    frame_to_sample(scene_start, fps, sr) + ms * u64::from(sr) / 1000
                }
            };
            if start >= total_samples {
                tracing::debug!(sfx = %trigger.sfx, "sound effect starts after the episode ends");
                continue;
            }
            if let Some(src) = assets.load_sfx(&trigger.sfx) {
                push_one_shot(
                    &mut segments,
                    Layer::Sfx,
                    &trigger.sfx,
                    src,
                    start,
                    sfx_gain,
                    total_samples,
                    sr,
                );
            }
        }

        for (line, authored) in st.lines.iter().zip(&scene.dialogue) {
            let blip_id = cast.blip_sound(&line.speaker, &cfg.default_blip);
            let reveal = line.timeline.reveal_frames_per_char();
            let mut source: Option<Option<Arc<AudioPcm>>> = None;
            for (i, ch) in authored.text().chars().enumerate() {
                if ch.is_whitespace() || i % every != 0 {
                    continue;
                }
                let Some(&f) = reveal.get(i) else {
                    break;
                };
                let src = source.get_or_insert_with(|| assets.load_blip(blip_id));
                let Some(src) = src.clone() else {
                    break;
                };
                let start = frame_to_sample(scene_start + line.start_frame + f, fps, sr);
                push_one_shot(
                    &mut segments,
                    Layer::Blip,
                    blip_id,
                    src,
                    start,
                    blip_gain,
                    total_samples,
                    sr,
                );
            }
        }
    }

    let ducking = cfg.ducking.then(|| {
        DuckingEnvelope::new(
            &timing.dialogue_intervals_secs(),
            cfg.duck_db,
            cfg.duck_fade_ms / 1000.0,
        )
    });

    tracing::debug!(
        segments = segments.len(),
        total_samples,
        "audio manifest built"
    );
    AudioManifest {
        sample_rate: sr,
        channels: cfg.channels,
        total_samples,
        music_gain_db: cfg.music_gain_db,
        ducking,
        segments,
    }
}

/// Lay the music bed end to end until it covers the episode, fading each seam.
fn schedule_music(
    segments: &mut Vec<AudioSegment>,
    music: Arc<AudioPcm>,
    identifier: &str,
    total_samples: u64,
    sr: u32,
    cfg: &AudioConfig,
) {
    let loop_len = source_len_samples(&music, sr);
    if loop_len == 0 || total_samples == 0 {
        return;
    }
    let seam = cfg.loop_seam_ms / 1000.0;
    let volume = db_to_gain(cfg.music_gain_db);
    let mut start = 0u64;
    while start < total_samples {
        let end = (start + loop_len).min(total_samples);
        let more = end < total_samples;
        segments.push(AudioSegment {
            layer: Layer::Music,
            identifier: identifier.to_string(),
            timeline_start_sample: start,
            timeline_end_sample: end,
            source_start_sec: 0.0,
            volume,
            fade_in_sec: if start > 0 { seam } else { 0.0 },
            fade_out_sec: if more { seam } else { 0.0 },
            source: music.clone(),
        });
        start = end;
    }
}

#[allow(clippy::too_many_arguments)]
fn push_one_shot(
    segments: &mut Vec<AudioSegment>,
    layer: Layer,
    identifier: &str,
    source: Arc<AudioPcm>,
    start: u64,
    volume: f32,
    total_samples: u64,
    sr: u32,
) {
    let end = (start + source_len_samples(&source, sr)).min(total_samples);
    if end <= start {
        return;
    }
    segments.push(AudioSegment {
        layer,
        identifier: identifier.to_string(),
        timeline_start_sample: start,
        timeline_end_sample: end,
        source_start_sec: 0.0,
        volume,
        fade_in_sec: 0.0,
        fade_out_sec: 0.0,
        source,
    });
}

/// Source length in output sample frames.
fn source_len_samples(src: &AudioPcm, sr: u32) -> u64 {
    let frames = src.frames() as u128;
    let num = frames * u128::from(sr);
    let den = u128::from(src.sample_rate.max(1));
    (num / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/manifest.rs"]
mod tests;
