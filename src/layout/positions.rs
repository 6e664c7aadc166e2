use std::collections::BTreeMap;
use std::path::Path;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::warnings::{AssetKind, Component, WarningLog};
use crate::render::format::RenderFormat;
use crate::script::model::Scene;

/// Relative location of the location catalog inside an asset root.
pub const LOCATIONS_FILE: &str = "data/locations.json";

/// Resolution that position tables are authored against unless they say otherwise.
pub const LEGACY_REFERENCE: Canvas = Canvas {
    width: 1080,
    height: 1920,
};

/// Direction a character faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Sprite drawn as authored.
    #[default]
    Right,
    /// Sprite mirrored horizontally.
    Left,
}

/// Authored slot coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlotPosition {
    /// X in reference pixels.
    pub x: f64,
    /// Y in reference pixels (sprite feet).
    pub y: f64,
    /// Facing.
    #[serde(default)]
    pub facing: Facing,
}

/// One location's position table.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationLayout {
    /// Slot name to coordinates.
    #[serde(default)]
    pub character_positions: BTreeMap<String, SlotPosition>,
    /// Resolution the coordinates were authored for.
    #[serde(default)]
    pub reference: Option<Canvas>,
}

/// Slot resolved to output pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedPosition {
    /// X in output pixels.
    pub x: i32,
    /// Y in output pixels.
    pub y: i32,
    /// Facing.
    pub facing: Facing,
}

#[derive(serde::Deserialize)]
struct LocationsDoc {
    #[serde(default)]
    locations: BTreeMap<String, LocationLayout>,
}

/// Location catalog loaded from `data/locations.json`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationCatalog {
    locations: BTreeMap<String, LocationLayout>,
}

impl LocationCatalog {
    /// Load the catalog from an asset root. An absent file yields an empty catalog, which makes
    /// every slot lookup a layout error.
    pub fn load(assets_root: &Path) -> ReelResult<Self> {
        let path = assets_root.join(LOCATIONS_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no location catalog");
            return Ok(Self::default());
        }
        use anyhow::Context as _;
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("read location catalog '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parse a catalog document.
    ///
    /// Slot coordinates must be whole reference pixels, so integer rescales stay exact.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let doc: LocationsDoc = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("{LOCATIONS_FILE}: {e}")))?;
        for (location, layout) in &doc.locations {
            for (slot, pos) in &layout.character_positions {
                if !is_whole(pos.x) || !is_whole(pos.y) {
                    return Err(ReelError::layout(
                        location.as_str(),
                        slot.as_str(),
                        format!(
                            "coordinates ({}, {}) must be whole reference pixels",
                            pos.x, pos.y
                        ),
                    ));
                }
            }
        }
        Ok(Self {
            locations: doc.locations,
        })
    }

    /// Insert or replace one location.
    pub fn insert(&mut self, id: impl Into<String>, layout: LocationLayout) {
        self.locations.insert(id.into(), layout);
    }

    /// Layout for `location`, if declared.
    pub fn get(&self, location: &str) -> Option<&LocationLayout> {
        self.locations.get(location)
    }

    /// Resolve `slot` of `location` to output pixels for `format`.
    ///
    /// Coordinates are rescaled linearly by `target / reference` per axis and truncated toward
    /// zero. Unknown locations and slots are errors, never silently defaulted.
    pub fn resolve(
        &self,
        location: &str,
        slot: &str,
        format: &RenderFormat,
    ) -> ReelResult<ResolvedPosition> {
        let layout = self
            .locations
            .get(location)
            .ok_or_else(|| ReelError::layout(location, slot, "location has no position table"))?;
        let pos = layout.character_positions.get(slot).ok_or_else(|| {
            let known: Vec<&str> = layout
                .character_positions
                .keys()
                .map(String::as_str)
                .collect();
            ReelError::layout(
                location,
                slot,
                format!("unknown slot (declared: {})", known.join(", ")),
            )
        })?;
        let reference = layout.reference.unwrap_or(LEGACY_REFERENCE);
        Ok(rescale(pos, reference, format.canvas()))
    }

    /// Resolve every present character of `scene`, in draw order.
    ///
    /// Two characters sharing a slot is recorded as a layout warning.
    pub fn resolve_scene(
        &self,
        scene: &Scene,
        format: &RenderFormat,
        warnings: &WarningLog,
    ) -> ReelResult<Vec<(String, ResolvedPosition)>> {
        let mut out = Vec::with_capacity(scene.characters_present.len());
        let mut used: BTreeMap<&str, &str> = BTreeMap::new();
        for character in &scene.characters_present {
            let slot = scene
                .character_positions
                .get(character)
                .map(String::as_str)
                .unwrap_or_default();
            if let Some(other) = used.insert(slot, character) {
                warnings.push_once(
                    Component::Layout,
                    AssetKind::Slot,
                    format!("{}/{slot}", scene.background),
                    format!("'{character}' shares slot '{slot}' with '{other}'"),
                );
            }
            let pos = self.resolve(&scene.background, slot, format)?;
            out.push((character.clone(), pos));
        }
        Ok(out)
    }
}

fn is_whole(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

fn rescale(pos: &SlotPosition, reference: Canvas, target: Canvas) -> ResolvedPosition {
    let sx = f64::from(target.width) / f64::from(reference.width.max(1));
    let sy = f64::from(target.height) / f64::from(reference.height.max(1));
    ResolvedPosition {
        x: (pos.x * sx).trunc() as i32,
        y: (pos.y * sy).trunc() as i32,
        facing: pos.facing,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/positions.rs"]
mod tests;
