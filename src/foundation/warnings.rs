use std::sync::{Arc, Mutex, MutexGuard};

/// Pipeline component that raised a [`Warning`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Sprite/background loader.
    Assets,
    /// Position/layout resolver.
    Layout,
    /// Typewriter text renderer.
    Text,
    /// Audio mixer.
    Audio,
    /// Video encoder/muxer.
    Encoder,
    /// Orchestrator.
    Pipeline,
}

/// Kind of asset (or concern) a warning refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Location background (single layer or parallax directory).
    Background,
    /// Character sprite.
    Sprite,
    /// Background music.
    Music,
    /// One-shot sound effect.
    Sfx,
    /// Per-character text blip.
    Blip,
    /// Dialogue font.
    Font,
    /// End-card template image.
    Template,
    /// Position slot table.
    Slot,
    /// Audio/video duration agreement at mux time.
    Mux,
}

/// One degraded-but-non-fatal condition recorded during a render run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Warning {
    /// Component that raised the warning.
    pub component: Component,
    /// Asset kind concerned.
    pub asset_kind: AssetKind,
    /// Identifier as authored (location id, `character/state`, music file, ...).
    pub identifier: String,
    /// Human readable detail.
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:?}/{:?}] {}: {}",
            self.component, self.asset_kind, self.identifier, self.message
        )
    }
}

/// Run-scoped, append-only warning log.
///
/// Clones share the same underlying list, so one log can be handed to every component and to
/// concurrent per-format workers. Appends are serialized by a mutex; entries are never torn.
#[derive(Clone, Debug, Default)]
pub struct WarningLog {
    inner: Arc<Mutex<Vec<Warning>>>,
}

impl WarningLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Warning>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append a warning and mirror it to `tracing`.
    pub fn push(
        &self,
        component: Component,
        asset_kind: AssetKind,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) {
        let w = Warning {
            component,
            asset_kind,
            identifier: identifier.into(),
            message: message.into(),
        };
        tracing::warn!(
            component = ?w.component,
            asset_kind = ?w.asset_kind,
            identifier = %w.identifier,
            "{}",
            w.message
        );
        self.lock().push(w);
    }

    /// Append a warning only if an identical `(component, asset_kind, identifier)` is not
    /// already recorded. Returns `true` when appended.
    pub fn push_once(
        &self,
        component: Component,
        asset_kind: AssetKind,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        let identifier = identifier.into();
        let exists = self.lock().iter().any(|w| {
            w.component == component && w.asset_kind == asset_kind && w.identifier == identifier
        });
        if exists {
            return false;
        }
        self.push(component, asset_kind, identifier, message);
        true
    }

    /// Append every entry of another log.
    pub fn merge(&self, other: &WarningLog) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let entries = other.snapshot();
        self.lock().extend(entries);
    }

    /// Copy of the current entries in append order.
    pub fn snapshot(&self) -> Vec<Warning> {
        self.lock().clone()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/warnings.rs"]
mod tests;
