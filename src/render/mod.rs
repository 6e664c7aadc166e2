//! Frame rendering: rasters, camera, dialogue text, scene compositing, end card, storyboard.

/// Camera viewport interpolation.
pub mod camera;
/// Scene and episode frame sequences.
pub mod compositor;
/// End card.
pub mod endcard;
/// Render format presets.
pub mod format;
/// Premultiplied RGBA8 rasters and nearest-neighbour resampling.
pub mod raster;
/// Storyboard contact sheet.
pub mod storyboard;
/// Typewriter dialogue box.
pub mod text;
