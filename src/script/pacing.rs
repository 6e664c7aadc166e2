use crate::script::model::Script;

/// Shortest scene a pacing adjustment may produce.
pub const MIN_SCENE_SECONDS: f64 = 4.0;

/// Named pacing preset used to render alternative cuts of one script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PacingVariant {
    /// Preset name.
    pub name: String,
    /// Scene duration factor (< 1 is faster).
    pub pacing_multiplier: f64,
    /// Seconds added to the last scene.
    pub punchline_hold_seconds: f64,
    /// Music file forced on every scene, if any.
    #[serde(default)]
    pub music: Option<String>,
}

impl PacingVariant {
    /// Default pacing; music follows the episode mood.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            pacing_multiplier: 1.0,
            punchline_hold_seconds: 2.0,
            music: None,
        }
    }

    /// Faster cut with energetic music.
    pub fn upbeat() -> Self {
        Self {
            name: "upbeat".to_string(),
            pacing_multiplier: 0.85,
            punchline_hold_seconds: 1.0,
            music: Some("upbeat_theme.wav".to_string()),
        }
    }

    /// Slower cut with a longer punchline hold.
    pub fn tense() -> Self {
        Self {
            name: "tense".to_string(),
            pacing_multiplier: 1.15,
            punchline_hold_seconds: 3.0,
            music: Some("tense_theme.wav".to_string()),
        }
    }

    /// All built-in presets.
    pub fn presets() -> Vec<Self> {
        vec![Self::standard(), Self::upbeat(), Self::tense()]
    }

    /// Look up a built-in preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::presets().into_iter().find(|p| p.name == name)
    }
}

impl Script {
    /// Copy of this script with the variant's pacing applied.
    ///
    /// Scene durations are scaled (never below [`MIN_SCENE_SECONDS`]) and the last scene is
    /// lengthened by the punchline hold. `self` is left untouched.
    pub fn with_pacing(&self, variant: &PacingVariant) -> Script {
        let mut out = self.clone();
        let mult = if variant.pacing_multiplier.is_finite() && variant.pacing_multiplier > 0.0 {
            variant.pacing_multiplier
        } else {
            1.0
        };
        for scene in &mut out.scenes {
            if let Some(d) = scene.duration_seconds {
                scene.duration_seconds = Some((d * mult).max(MIN_SCENE_SECONDS));
            }
            if let Some(music) = &variant.music {
                scene.music = Some(music.clone());
            }
        }
        if let Some(last) = out.scenes.last_mut()
            && let Some(d) = last.duration_seconds
        {
            last.duration_seconds = Some(d + variant.punchline_hold_seconds.max(0.0));
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/pacing.rs"]
mod tests;
