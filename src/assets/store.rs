use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    assets::decode::{self, AudioPcm},
    config::PipelineConfig,
    foundation::core::Rgba8,
    foundation::warnings::{AssetKind, Component, WarningLog},
    render::format::{DEFAULT_PARALLAX, RenderFormat},
    render::raster::Raster,
    script::cast::CharacterCatalog,
    script::model::Script,
};

/// Parallax layer files inside `backgrounds/<location>/`, back to front.
pub const PARALLAX_LAYERS: [&str; 4] = ["background", "midground", "foreground", "effects"];

/// Fill of the missing-background placeholder.
pub const BACKGROUND_PLACEHOLDER: Rgba8 = Rgba8::rgb(26, 26, 58);

/// Fill of the missing-sprite placeholder.
pub const SPRITE_PLACEHOLDER: Rgba8 = Rgba8::rgba(255, 0, 255, 160);

/// Size of the missing-sprite placeholder.
pub const SPRITE_PLACEHOLDER_SIZE: (u32, u32) = (192, 288);

/// End-card template image.
pub const ENDCARD_TEMPLATE: &str = "ui/endcard_template.png";

/// How a background was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundSource {
    /// Layer directory.
    Parallax,
    /// Single flat image.
    Single,
    /// Nothing found.
    Placeholder,
}

/// One background layer at the render format's resolution.
#[derive(Clone, Debug)]
pub struct BackgroundLayer {
    /// Layer pixels, already nearest-scaled to the frame size.
    pub raster: Arc<Raster>,
    /// Fraction of the camera pan this layer scrolls by.
    pub coefficient: f64,
}

/// Resolved background of one location.
#[derive(Clone, Debug)]
pub struct Background {
    /// Resolution outcome.
    pub source: BackgroundSource,
    /// Layers, back to front.
    pub layers: Vec<BackgroundLayer>,
}

/// An asset the script references that does not resolve.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MissingAsset {
    /// Asset kind.
    pub kind: AssetKind,
    /// Identifier as authored.
    pub identifier: String,
}

type Cache<T> = Mutex<HashMap<PathBuf, Option<Arc<T>>>>;

/// Read-only asset tree with a per-run decode cache.
///
/// Every lookup follows one ordered resolution policy per asset kind that ends in a placeholder
/// (images) or `None` (audio, fonts) plus a warning in the run's [`WarningLog`]. Lookups never
/// fail.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    warnings: WarningLog,
    images: Cache<Raster>,
    sounds: Cache<AudioPcm>,
    fonts: Cache<Vec<u8>>,
}

impl AssetStore {
    /// Store rooted at `root`, reporting to `warnings`.
    pub fn new(root: impl Into<PathBuf>, warnings: WarningLog) -> Self {
        Self {
            root: root.into(),
            warnings,
            images: Mutex::new(HashMap::new()),
            sounds: Mutex::new(HashMap::new()),
            fonts: Mutex::new(HashMap::new()),
        }
    }

    /// Asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Warning log this store reports to.
    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    /// Resolve a location background for `format`.
    ///
    /// Order: `backgrounds/<id>/` layer directory, `backgrounds/<id>.png`, flat placeholder.
    #[tracing::instrument(skip(self, format), fields(format = %format.name))]
    pub fn load_background(&self, location: &str, format: &RenderFormat) -> Background {
        let (w, h) = (format.width, format.height);
        if is_plain_name(location) {
            let dir = self.root.join("backgrounds").join(location);
            if dir.is_dir() {
                let mut layers = Vec::new();
                for (i, name) in PARALLAX_LAYERS.iter().enumerate() {
                    let path = dir.join(format!("{name}.png"));
                    if let Some(img) = self.image_at(&path) {
                        let coefficient = format
                            .parallax
                            .get(i)
                            .or(DEFAULT_PARALLAX.get(i))
                            .copied()
                            .unwrap_or(1.0);
                        layers.push(BackgroundLayer {
                            raster: Arc::new(img.scale_nearest(w, h)),
                            coefficient,
                        });
                    }
                }
                if !layers.is_empty() {
                    tracing::debug!(location, layers = layers.len(), "parallax background");
                    return Background {
                        source: BackgroundSource::Parallax,
                        layers,
                    };
                }
            }
            let single = self.root.join("backgrounds").join(format!("{location}.png"));
            if let Some(img) = self.image_at(&single) {
                tracing::debug!(location, "single-layer background");
                return Background {
                    source: BackgroundSource::Single,
                    layers: vec![BackgroundLayer {
                        raster: Arc::new(img.scale_nearest(w, h)),
                        coefficient: 1.0,
                    }],
                };
            }
        }
        self.warnings.push_once(
            Component::Assets,
            AssetKind::Background,
            location,
            "background not found; using flat placeholder",
        );
        Background {
            source: BackgroundSource::Placeholder,
            layers: vec![BackgroundLayer {
                raster: Arc::new(Raster::filled(w, h, BACKGROUND_PLACEHOLDER)),
                coefficient: 0.0,
            }],
        }
    }

    /// Resolve a character sprite.
    ///
    /// Order: `characters/<id>/<state>.png`, `characters/<id>/idle.png`, placeholder.
    pub fn load_sprite(&self, character: &str, state: &str) -> Arc<Raster> {
        if is_plain_name(character) {
            let dir = self.root.join("characters").join(character);
            for s in [state, "idle"] {
                if !is_plain_name(s) {
                    continue;
                }
                if let Some(img) = self.image_at(&dir.join(format!("{s}.png"))) {
                    return img;
                }
            }
        }
        self.warnings.push_once(
            Component::Assets,
            AssetKind::Sprite,
            character,
            format!("no sprite for state '{state}' or 'idle'; using placeholder"),
        );
        let (w, h) = SPRITE_PLACEHOLDER_SIZE;
        Arc::new(Raster::filled(w, h, SPRITE_PLACEHOLDER))
    }

    /// Optional end-card template; absence is not a warning.
    pub fn load_endcard_template(&self) -> Option<Arc<Raster>> {
        self.image_at(&self.root.join(ENDCARD_TEMPLATE))
    }

    /// Music file under `music/`.
    pub fn load_music(&self, file: &str) -> Option<Arc<AudioPcm>> {
        self.sound(AssetKind::Music, "music", file)
    }

    /// Sound effect under `sfx/` (`.wav` appended when the id has no extension).
    pub fn load_sfx(&self, id: &str) -> Option<Arc<AudioPcm>> {
        self.sound(AssetKind::Sfx, "sfx", id)
    }

    /// Text blip under `sfx/`.
    pub fn load_blip(&self, id: &str) -> Option<Arc<AudioPcm>> {
        self.sound(AssetKind::Blip, "sfx", id)
    }

    /// Font bytes at `rel` under the root.
    pub fn load_font(&self, rel: &str) -> Option<Arc<Vec<u8>>> {
        let path = self.root.join(rel);
        let loaded = cached(&self.fonts, &path, || match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Some(Arc::new(bytes)),
            _ => None,
        });
        if loaded.is_none() {
            self.warnings.push_once(
                Component::Assets,
                AssetKind::Font,
                rel,
                "font not found; dialogue drawn without glyphs",
            );
        }
        loaded
    }

    /// Assets `script` references that would fall back to a placeholder or silence.
    ///
    /// Advisory only: nothing is decoded and nothing is written to the warning log.
    pub fn missing_assets(
        &self,
        script: &Script,
        cast: &CharacterCatalog,
        cfg: &PipelineConfig,
    ) -> Vec<MissingAsset> {
        let mut out: Vec<MissingAsset> = Vec::new();
        let mut note = |kind: AssetKind, identifier: &str| {
            let m = MissingAsset {
                kind,
                identifier: identifier.to_string(),
            };
            if !out.contains(&m) {
                out.push(m);
            }
        };

        for scene in &script.scenes {
            if !self.background_exists(&scene.background) {
                note(AssetKind::Background, &scene.background);
            }
            for character in &scene.characters_present {
                if !self.sprite_exists(character, scene.animation_for(character)) {
                    note(AssetKind::Sprite, character);
                }
            }
            for line in &scene.dialogue {
                if !self.sprite_exists(&line.character, "talking") {
                    note(AssetKind::Sprite, &line.character);
                }
                let blip = cast.blip_sound(&line.character, &cfg.audio.default_blip);
                if !self.sound_path("sfx", blip).is_some_and(|p| p.is_file()) {
                    note(AssetKind::Blip, blip);
                }
            }
            for trigger in &scene.sfx_triggers {
                if !self.sound_path("sfx", &trigger.sfx).is_some_and(|p| p.is_file()) {
                    note(AssetKind::Sfx, &trigger.sfx);
                }
            }
        }
        let music = cfg.music.file_for(script);
        if !self.sound_path("music", &music).is_some_and(|p| p.is_file()) {
            note(AssetKind::Music, &music);
        }
        if !self.root.join(&cfg.text.font_file).is_file() {
            note(AssetKind::Font, &cfg.text.font_file);
        }
        out
    }

    fn background_exists(&self, location: &str) -> bool {
        if !is_plain_name(location) {
            return false;
        }
        let dir = self.root.join("backgrounds").join(location);
        PARALLAX_LAYERS
            .iter()
            .any(|n| dir.join(format!("{n}.png")).is_file())
            || self
                .root
                .join("backgrounds")
                .join(format!("{location}.png"))
                .is_file()
    }

    fn sprite_exists(&self, character: &str, state: &str) -> bool {
        if !is_plain_name(character) {
            return false;
        }
        let dir = self.root.join("characters").join(character);
        [state, "idle"]
            .iter()
            .any(|s| is_plain_name(s) && dir.join(format!("{s}.png")).is_file())
    }

    fn sound_path(&self, dir: &str, id: &str) -> Option<PathBuf> {
        if !is_plain_name(id) {
            return None;
        }
        let file = if Path::new(id).extension().is_some() {
            id.to_string()
        } else {
            format!("{id}.wav")
        };
        Some(self.root.join(dir).join(file))
    }

    fn sound(&self, kind: AssetKind, dir: &str, id: &str) -> Option<Arc<AudioPcm>> {
        let loaded = self.sound_path(dir, id).and_then(|path| {
            cached(&self.sounds, &path, || {
                let bytes = std::fs::read(&path).ok()?;
                match decode::decode_wav(&bytes) {
                    Ok(pcm) => Some(Arc::new(pcm)),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "undecodable audio");
                        None
                    }
                }
            })
        });
        if loaded.is_none() {
            self.warnings.push_once(
                Component::Assets,
                kind,
                id,
                format!("{dir}/{id} missing or unreadable; substituting silence"),
            );
        }
        loaded
    }

    fn image_at(&self, path: &Path) -> Option<Arc<Raster>> {
        cached(&self.images, path, || {
            let bytes = std::fs::read(path).ok()?;
            match decode::decode_image(&bytes) {
                Ok(img) => Some(Arc::new(img)),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "undecodable image");
                    None
                }
            }
        })
    }
}

fn cached<T>(
    cache: &Cache<T>,
    path: &Path,
    load: impl FnOnce() -> Option<Arc<T>>,
) -> Option<Arc<T>> {
    if let Some(hit) = lock(cache).get(path) {
        return hit.clone();
    }
    let value = load();
    lock(cache).insert(path.to_path_buf(), value.clone());
    value
}

fn lock<T>(cache: &Cache<T>) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Option<Arc<T>>>> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Identifiers are single path components: no separators, no `..`, not empty.
fn is_plain_name(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
