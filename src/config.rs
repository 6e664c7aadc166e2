//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) yields a working
//! configuration. Values are checked by [`PipelineConfig::validate`] before a render starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::format::RenderFormat;
use crate::script::model::Script;

/// Top-level pipeline configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame rate and dialogue pacing.
    pub timing: TimingConfig,
    /// Mixer gains and ducking.
    pub audio: AudioConfig,
    /// Encoder settings and retry policy.
    pub encode: EncodeConfig,
    /// Output acceptance bounds.
    pub quality: QualityConfig,
    /// Render format presets available to a run.
    pub formats: Vec<RenderFormat>,
    /// Music selection table.
    pub music: MusicConfig,
    /// End-card styling.
    pub end_card: EndCardStyle,
    /// Dialogue box styling.
    pub text: TextStyle,
    /// Directory for the mixed-audio scratch file. Defaults to the output directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            audio: AudioConfig::default(),
            encode: EncodeConfig::default(),
            quality: QualityConfig::default(),
            formats: vec![RenderFormat::horizontal(), RenderFormat::vertical()],
            music: MusicConfig::default(),
            end_card: EndCardStyle::default(),
            text: TextStyle::default(),
            scratch_dir: None,
        }
    }
}

/// Frame rate and dialogue pacing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Output frame rate.
    pub fps: Fps,
    /// Characters revealed per second when a line does not override it.
    pub cps: f64,
    /// Post-reveal hold when a line does not override it.
    pub hold_seconds: f64,
    /// Silence before the first dialogue line of each scene.
    pub lead_in_seconds: f64,
    /// Padding after the last dialogue line of each scene.
    pub tail_seconds: f64,
    /// End-card duration when the script does not set one.
    pub end_card_seconds: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            cps: 12.0,
            hold_seconds: 2.0,
            lead_in_seconds: 0.0,
            tail_seconds: 0.0,
            end_card_seconds: 3.0,
        }
    }
}

/// Mixer configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count (1 or 2).
    pub channels: u16,
    /// Music bed baseline gain.
    pub music_gain_db: f32,
    /// Sound-effect gain.
    pub sfx_gain_db: f32,
    /// Text blip gain.
    pub blip_gain_db: f32,
    /// Additional (negative) offset applied to music during dialogue.
    pub duck_db: f32,
    /// Ramp length at ducking interval boundaries.
    pub duck_fade_ms: f64,
    /// Fade applied at each loop seam of repeated music.
    pub loop_seam_ms: f64,
    /// One blip every `blip_every` revealed characters.
    pub blip_every: usize,
    /// Blip file used when the cast catalog names none.
    pub default_blip: String,
    /// Whether music is ducked under dialogue.
    pub ducking: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            music_gain_db: -20.0,
            sfx_gain_db: -8.0,
            blip_gain_db: -14.0,
            duck_db: -6.0,
            duck_fade_ms: 30.0,
            loop_seam_ms: 5.0,
            blip_every: 3,
            default_blip: "text_blip_mid.wav".to_string(),
            ducking: true,
        }
    }
}

/// Encoder configuration and retry policy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Encoder executable, looked up on `PATH` when not absolute.
    pub ffmpeg_program: PathBuf,
    /// x264 constant rate factor.
    pub crf: u8,
    /// x264 preset.
    pub preset: String,
    /// AAC bitrate passed to the mux step.
    pub audio_bitrate: String,
    /// Wall-clock budget per format render.
    pub timeout_seconds: f64,
    /// Total encode attempts per format (first try included).
    pub max_attempts: u32,
    /// Sleep before each retry; the last entry repeats.
    pub backoff_ms: Vec<u64>,
    /// Audio/video duration disagreement tolerated silently at mux time.
    pub mux_tolerance_seconds: f64,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_program: PathBuf::from("ffmpeg"),
            crf: 18,
            preset: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
            timeout_seconds: 600.0,
            max_attempts: 3,
            backoff_ms: vec![500, 2_000, 5_000],
            mux_tolerance_seconds: 0.25,
        }
    }
}

impl EncodeConfig {
    /// Backoff before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> std::time::Duration {
        let idx = (retry.saturating_sub(1) as usize).min(self.backoff_ms.len().saturating_sub(1));
        std::time::Duration::from_millis(self.backoff_ms.get(idx).copied().unwrap_or(0))
    }
}

/// Output acceptance bounds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Accepted relative deviation from the target duration.
    pub duration_tolerance: f64,
    /// Smallest acceptable file.
    pub min_file_bytes: u64,
    /// Largest acceptable file.
    pub max_file_bytes: u64,
    /// Optional absolute lower duration bound.
    pub min_duration_seconds: Option<f64>,
    /// Optional absolute upper duration bound.
    pub max_duration_seconds: Option<f64>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            duration_tolerance: 0.15,
            min_file_bytes: 500 * 1024,
            max_file_bytes: 100 * 1024 * 1024,
            min_duration_seconds: None,
            max_duration_seconds: None,
        }
    }
}

/// Music selection table.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Episode mood to music file under `music/`.
    pub moods: BTreeMap<String, String>,
    /// Music file used when no mood matches.
    pub default_file: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        let mut moods = BTreeMap::new();
        for mood in ["everyday_life", "business", "diplomatic", "chill_hangout"] {
            moods.insert(mood.to_string(), "main_theme.wav".to_string());
        }
        for mood in ["mystery", "scheme"] {
            moods.insert(mood.to_string(), "tense_theme.wav".to_string());
        }
        Self {
            moods,
            default_file: "main_theme.wav".to_string(),
        }
    }
}

impl MusicConfig {
    /// Music file for `script`: the first scene music reference, else the episode mood, else
    /// the default file. A reference that is a known mood maps through the table; a scene
    /// reference that is not a mood is taken as a file name (`.wav` appended when it has no
    /// extension).
    pub fn file_for(&self, script: &Script) -> String {
        if let Some(reference) = script.scene_music().map(str::trim).filter(|r| !r.is_empty()) {
            if let Some(file) = self.moods.get(reference) {
                return file.clone();
            }
            return if Path::new(reference).extension().is_some() {
                reference.to_string()
            } else {
                format!("{reference}.wav")
            };
        }
        script
            .mood
            .as_deref()
            .and_then(|m| self.moods.get(m.trim()))
            .cloned()
            .unwrap_or_else(|| self.default_file.clone())
    }
}

/// End-card styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EndCardStyle {
    /// Branding line drawn under the title.
    pub brand_text: String,
    /// Fill used when `ui/endcard_template.png` is absent.
    pub background: Rgba8,
    /// Episode id and title color.
    pub text_color: Rgba8,
    /// Branding line color.
    pub brand_color: Rgba8,
    /// Title font size in pixels.
    pub title_size_px: f32,
    /// Episode id font size in pixels.
    pub id_size_px: f32,
    /// Branding font size in pixels.
    pub brand_size_px: f32,
}

impl Default for EndCardStyle {
    fn default() -> Self {
        Self {
            brand_text: "PIXREEL".to_string(),
            background: Rgba8::rgb(26, 26, 58),
            text_color: Rgba8::WHITE,
            brand_color: Rgba8::rgb(150, 150, 200),
            title_size_px: 20.0,
            id_size_px: 14.0,
            brand_size_px: 12.0,
        }
    }
}

/// Dialogue box styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font file relative to the asset root.
    pub font_file: String,
    /// Dialogue font size in pixels.
    pub font_size_px: f32,
    /// Speaker name font size in pixels.
    pub name_size_px: f32,
    /// Box fill.
    pub box_color: Rgba8,
    /// Box border.
    pub border_color: Rgba8,
    /// Border width in pixels.
    pub border_px: u32,
    /// Inner padding in pixels.
    pub padding_px: u32,
    /// Dialogue text color.
    pub text_color: Rgba8,
    /// Extra spacing between wrapped lines.
    pub line_gap_px: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_file: "ui/fonts/PressStart2P-Regular.ttf".to_string(),
            font_size_px: 16.0,
            name_size_px: 14.0,
            box_color: Rgba8::rgba(26, 26, 58, 216),
            border_color: Rgba8::WHITE,
            border_px: 2,
            padding_px: 12,
            text_color: Rgba8::WHITE,
            line_gap_px: 6.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| ReelError::serde(format!("config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ReelResult<()> {
        let t = &self.timing;
        Fps::new(t.fps.num, t.fps.den)?;
        if !(t.cps.is_finite() && t.cps > 0.0) {
            return Err(ReelError::config("timing.cps must be finite and > 0"));
        }
        for (name, v) in [
            ("timing.hold_seconds", t.hold_seconds),
            ("timing.lead_in_seconds", t.lead_in_seconds),
            ("timing.tail_seconds", t.tail_seconds),
            ("timing.end_card_seconds", t.end_card_seconds),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ReelError::config(format!("{name} must be finite and >= 0")));
            }
        }

        let a = &self.audio;
        if a.sample_rate == 0 {
            return Err(ReelError::config("audio.sample_rate must be > 0"));
        }
        if !(1..=2).contains(&a.channels) {
            return Err(ReelError::config("audio.channels must be 1 or 2"));
        }
        if a.blip_every == 0 {
            return Err(ReelError::config("audio.blip_every must be >= 1"));
        }
        if !(a.duck_db.is_finite() && a.duck_db < 0.0) {
            return Err(ReelError::config("audio.duck_db must be finite and < 0"));
        }
        for (name, v) in [
            ("audio.music_gain_db", a.music_gain_db),
            ("audio.sfx_gain_db", a.sfx_gain_db),
            ("audio.blip_gain_db", a.blip_gain_db),
        ] {
            if !v.is_finite() {
                return Err(ReelError::config(format!("{name} must be finite")));
            }
        }
        if !(a.duck_fade_ms.is_finite() && a.duck_fade_ms >= 0.0) {
            return Err(ReelError::config("audio.duck_fade_ms must be >= 0"));
        }
        if !(a.loop_seam_ms.is_finite() && a.loop_seam_ms >= 0.0) {
            return Err(ReelError::config("audio.loop_seam_ms must be >= 0"));
        }

        let e = &self.encode;
        if e.ffmpeg_program.as_os_str().is_empty() {
            return Err(ReelError::config("encode.ffmpeg_program must be non-empty"));
        }
        if e.crf > 51 {
            return Err(ReelError::config("encode.crf must be in 0..=51"));
        }
        if e.max_attempts == 0 {
            return Err(ReelError::config("encode.max_attempts must be >= 1"));
        }
        if !(e.timeout_seconds.is_finite() && e.timeout_seconds > 0.0) {
            return Err(ReelError::config("encode.timeout_seconds must be > 0"));
        }
        if !(e.mux_tolerance_seconds.is_finite() && e.mux_tolerance_seconds >= 0.0) {
            return Err(ReelError::config("encode.mux_tolerance_seconds must be >= 0"));
        }

        let q = &self.quality;
        if !(q.duration_tolerance.is_finite() && q.duration_tolerance >= 0.0) {
            return Err(ReelError::config("quality.duration_tolerance must be >= 0"));
        }
        if q.min_file_bytes > q.max_file_bytes {
            return Err(ReelError::config(
                "quality.min_file_bytes must be <= quality.max_file_bytes",
            ));
        }

        if self.formats.is_empty() {
            return Err(ReelError::config("at least one render format is required"));
        }
        for (i, f) in self.formats.iter().enumerate() {
            f.validate()?;
            if self.formats[..i].iter().any(|o| o.name == f.name) {
                return Err(ReelError::config(format!(
                    "duplicate render format name '{}'",
                    f.name
                )));
            }
        }

        if !(self.text.font_size_px.is_finite() && self.text.font_size_px > 0.0) {
            return Err(ReelError::config("text.font_size_px must be > 0"));
        }
        if !(self.text.name_size_px.is_finite() && self.text.name_size_px > 0.0) {
            return Err(ReelError::config("text.name_size_px must be > 0"));
        }
        Ok(())
    }

    /// Look up a render format by name.
    pub fn format(&self, name: &str) -> ReelResult<&RenderFormat> {
        self.formats
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ReelError::config(format!("unknown render format '{name}'")))
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
