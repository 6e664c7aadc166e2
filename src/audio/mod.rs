//! Episode soundtrack: scheduling, dialogue ducking, and mixing.

/// Music attenuation curve under dialogue.
pub mod ducking;
/// Segment scheduling for music, sound effects, and blips.
pub mod manifest;
/// Sample-accurate mixing and PCM output.
pub mod mix;
