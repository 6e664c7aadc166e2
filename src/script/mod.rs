//! Episode script model, validation, and dialogue timing.

/// Cast catalog (`data/characters.json`).
pub mod cast;
/// Script document types.
pub mod model;
/// Pacing presets.
pub mod pacing;
/// Reveal timelines and scene/episode timing.
pub mod timing;
pub(crate) mod validate;
