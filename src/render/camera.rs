//! Per-frame camera interpolation: pan and zoom from a scene's start view to its end view.

use crate::foundation::core::Vec2;
use crate::foundation::math::lerp;
use crate::script::model::CameraSpec;

/// Interpolated camera view for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Pan in world pixels.
    pub pan: Vec2,
    /// Zoom factor.
    pub zoom: f64,
}

impl Viewport {
    /// Static view at the origin with no zoom.
    pub const IDENTITY: Self = Self {
        pan: Vec2::ZERO,
        zoom: 1.0,
    };

    /// Pan seen by a layer scrolling at `coefficient` of the camera speed.
    pub fn parallax_offset(&self, coefficient: f64) -> Vec2 {
        self.pan * coefficient
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Viewport at `elapsed_secs` into a scene lasting `scene_secs`.
///
/// `value(t) = start + (end - start) * clamp(t / duration, 0, 1)`. No range clamping is applied
/// to the interpolated pan or zoom.
pub fn viewport_at(spec: Option<&CameraSpec>, elapsed_secs: f64, scene_secs: f64) -> Viewport {
    let Some(spec) = spec else {
        return Viewport::IDENTITY;
    };
    let t = if scene_secs > 0.0 {
        (elapsed_secs / scene_secs).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let start = spec.start;
    let end = spec.end_state();
    Viewport {
        pan: Vec2::new(lerp(start.x, end.x, t), lerp(start.y, end.y, t)),
        zoom: lerp(start.zoom, end.zoom, t),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/camera.rs"]
mod tests;
