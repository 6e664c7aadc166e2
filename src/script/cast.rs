use std::collections::BTreeMap;
use std::path::Path;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{ReelError, ReelResult};

/// Relative location of the cast catalog inside an asset root.
pub const CHARACTERS_FILE: &str = "data/characters.json";

/// Per-character presentation data.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CharacterProfile {
    /// Name shown in the dialogue box.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Name color in the dialogue box.
    #[serde(default)]
    pub name_color: Option<Rgba8>,
    /// Blip sound under `sfx/`.
    #[serde(default)]
    pub text_blip_sound: Option<String>,
}

#[derive(serde::Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    characters: BTreeMap<String, CharacterProfile>,
}

/// Cast catalog loaded from `data/characters.json`.
///
/// Characters without an entry fall back to their capitalised id, white, and the configured
/// default blip. That fallback is not a warning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CharacterCatalog {
    characters: BTreeMap<String, CharacterProfile>,
}

impl CharacterCatalog {
    /// Load the catalog from an asset root. An absent file yields an empty catalog.
    pub fn load(assets_root: &Path) -> ReelResult<Self> {
        let path = assets_root.join(CHARACTERS_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no cast catalog, using defaults");
            return Ok(Self::default());
        }
        use anyhow::Context as _;
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("read cast catalog '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parse a catalog document.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let doc: CatalogDoc = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("{CHARACTERS_FILE}: {e}")))?;
        Ok(Self {
            characters: doc.characters,
        })
    }

    /// Insert or replace one profile.
    pub fn insert(&mut self, id: impl Into<String>, profile: CharacterProfile) {
        self.characters.insert(id.into(), profile);
    }

    /// Display name for `id`.
    pub fn display_name(&self, id: &str) -> String {
        self.characters
            .get(id)
            .and_then(|p| p.nickname.clone())
            .unwrap_or_else(|| capitalise(id))
    }

    /// Name color for `id`.
    pub fn name_color(&self, id: &str) -> Rgba8 {
        self.characters
            .get(id)
            .and_then(|p| p.name_color)
            .unwrap_or(Rgba8::WHITE)
    }

    /// Blip sound for `id`, or `default_blip`.
    pub fn blip_sound<'a>(&'a self, id: &str, default_blip: &'a str) -> &'a str {
        self.characters
            .get(id)
            .and_then(|p| p.text_blip_sound.as_deref())
            .unwrap_or(default_blip)
    }
}

fn capitalise(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/cast.rs"]
mod tests;
