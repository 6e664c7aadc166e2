//! Asset resolution: backgrounds, sprites, audio, and fonts from a read-only asset tree.

/// Image and WAV decoding.
pub mod decode;
/// Cached asset lookups with placeholder fallbacks.
pub mod store;
