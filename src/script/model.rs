use std::collections::BTreeMap;
use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};

/// Episode script: the single input contract of a render.
///
/// Required fields are modelled as optional or defaulted so that a missing field surfaces as a
/// [`ReelError::ScriptValidation`] naming its path rather than a bare parse error.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Script {
    /// Episode identifier, e.g. `EP012`.
    #[serde(default)]
    pub episode_id: String,
    /// Episode title shown on the end card.
    #[serde(default)]
    pub title: String,
    /// Episode mood (situation), used for music selection.
    #[serde(default, alias = "situation")]
    pub mood: Option<String>,
    /// Target runtime for the quality gate. Defaults to the planned runtime.
    #[serde(default)]
    pub target_duration_seconds: Option<f64>,
    /// Scenes in play order.
    #[serde(default)]
    pub scenes: Vec<Scene>,
    /// Closing card.
    #[serde(default)]
    pub end_card: EndCard,
}

/// One scene of a [`Script`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// Location identifier; selects the background and the position table.
    #[serde(default)]
    pub background: String,
    /// Authored duration. May be extended to fit dialogue.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Characters on screen, drawn in this order.
    #[serde(default)]
    pub characters_present: Vec<String>,
    /// Character to position slot.
    #[serde(default)]
    pub character_positions: BTreeMap<String, String>,
    /// Character to animation state (defaults to `idle`).
    #[serde(default)]
    pub character_animations: BTreeMap<String, String>,
    /// Dialogue lines, spoken one after another.
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
    /// Sound effect cues.
    #[serde(default)]
    pub sfx_triggers: Vec<SfxTrigger>,
    /// Music file or mood reference for this scene.
    #[serde(default)]
    pub music: Option<String>,
    /// Optional pan/zoom over the scene.
    #[serde(default)]
    pub camera: Option<CameraSpec>,
}

impl Scene {
    /// Authored duration in seconds (0 when absent; validation rejects that case).
    pub fn authored_duration_secs(&self) -> f64 {
        self.duration_seconds.unwrap_or(0.0)
    }

    /// Animation state authored for `character`.
    pub fn animation_for(&self, character: &str) -> &str {
        self.character_animations
            .get(character)
            .map(String::as_str)
            .unwrap_or("idle")
    }
}

/// One line of dialogue.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DialogueLine {
    /// Speaker identifier.
    #[serde(default)]
    pub character: String,
    /// Literal text. Empty text is allowed; a missing field is not.
    #[serde(default)]
    pub text: Option<String>,
    /// Reveal speed override.
    #[serde(default)]
    pub cps: Option<f64>,
    /// Post-reveal hold override.
    #[serde(default)]
    pub hold_seconds: Option<f64>,
}

impl DialogueLine {
    /// Text, empty when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Sound effect cue.
///
/// Placed at `time_ms` from scene start, or at the start of a dialogue line when `timing` is
/// `with_dialogue_N` (1-based).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SfxTrigger {
    /// Sound file under `sfx/` (`.wav` appended when missing).
    #[serde(default)]
    pub sfx: String,
    /// Offset from scene start in milliseconds.
    #[serde(default)]
    pub time_ms: Option<u64>,
    /// Symbolic anchor, `with_dialogue_N`.
    #[serde(default)]
    pub timing: Option<String>,
}

impl SfxTrigger {
    /// Dialogue line index (0-based) named by `timing`, if it has the `with_dialogue_N` form.
    pub fn dialogue_anchor(&self) -> Option<usize> {
        let n: usize = self
            .timing
            .as_deref()?
            .strip_prefix("with_dialogue_")?
            .parse()
            .ok()?;
        n.checked_sub(1)
    }
}

/// Camera position in world pixels plus zoom.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraState {
    /// Pan x.
    #[serde(default)]
    pub x: f64,
    /// Pan y.
    #[serde(default)]
    pub y: f64,
    /// Zoom factor (1.0 = none).
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

fn default_zoom() -> f64 {
    1.0
}

/// End state of a camera move; absent fields repeat the start state.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraEnd {
    /// Pan x.
    #[serde(default)]
    pub x: Option<f64>,
    /// Pan y.
    #[serde(default)]
    pub y: Option<f64>,
    /// Zoom factor.
    #[serde(default)]
    pub zoom: Option<f64>,
}

/// Scene camera move.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraSpec {
    /// State at scene start.
    #[serde(default)]
    pub start: CameraState,
    /// State at scene end.
    #[serde(default)]
    pub end: CameraEnd,
}

impl CameraSpec {
    /// Fully resolved end state.
    pub fn end_state(&self) -> CameraState {
        CameraState {
            x: self.end.x.unwrap_or(self.start.x),
            y: self.end.y.unwrap_or(self.start.y),
            zoom: self.end.zoom.unwrap_or(self.start.zoom),
        }
    }
}

/// Closing card appended after the last scene.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EndCard {
    /// Card duration; the configured default applies when absent.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Optional call-to-action line.
    #[serde(default)]
    pub text: Option<String>,
}

impl Script {
    /// Load and validate a script from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read script '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parse and validate a script from a JSON string.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let script: Self =
            serde_json::from_str(s).map_err(|e| ReelError::serde(format!("script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> ReelResult<()> {
        crate::script::validate::validate_script(self)
    }

    /// Music reference for the episode: the first scene that names one.
    pub fn scene_music(&self) -> Option<&str> {
        self.scenes.iter().find_map(|s| s.music.as_deref())
    }
}
