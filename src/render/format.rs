use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// Parallax scroll coefficient per background layer, back to front.
pub const DEFAULT_PARALLAX: [f64; 4] = [0.2, 0.5, 0.8, 0.9];

/// Dialogue box placement inside a [`RenderFormat`].
///
/// The box is centred horizontally; `y` is the top edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextBoxGeometry {
    /// Box width in pixels.
    pub width: u32,
    /// Box height in pixels.
    pub height: u32,
    /// Top edge in pixels.
    pub y: u32,
}

/// Named output preset: resolution, text-box geometry and parallax coefficients.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderFormat {
    /// Preset name, also used as the output file suffix.
    pub name: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Dialogue box geometry.
    pub text_box: TextBoxGeometry,
    /// Scroll coefficient per parallax layer (back to front).
    #[serde(default = "default_parallax")]
    pub parallax: Vec<f64>,
    /// Integer nearest-neighbour upscale applied to sprites.
    #[serde(default = "default_sprite_scale")]
    pub sprite_scale: u32,
}

fn default_parallax() -> Vec<f64> {
    DEFAULT_PARALLAX.to_vec()
}

fn default_sprite_scale() -> u32 {
    1
}

impl RenderFormat {
    /// 1920x1080 widescreen preset.
    pub fn horizontal() -> Self {
        Self {
            name: "horizontal".to_string(),
            width: 1920,
            height: 1080,
            text_box: TextBoxGeometry {
                width: 1200,
                height: 180,
                y: 880,
            },
            parallax: default_parallax(),
            sprite_scale: 1,
        }
    }

    /// 1080x1920 tall preset.
    pub fn vertical() -> Self {
        Self {
            name: "vertical".to_string(),
            width: 1080,
            height: 1920,
            text_box: TextBoxGeometry {
                width: 900,
                height: 180,
                y: 1680,
            },
            parallax: default_parallax(),
            sprite_scale: 1,
        }
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Check geometry is encodable and the text box fits.
    pub fn validate(&self) -> ReelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ReelError::config("render format name must be non-empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::config(format!(
                "render format '{}' must have non-zero width/height",
                self.name
            )));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ReelError::config(format!(
                "render format '{}' width/height must be even (yuv420p)",
                self.name
            )));
        }
        let tb = self.text_box;
        if tb.width == 0
            || tb.height == 0
            || tb.width > self.width
            || tb.y + tb.height > self.height
        {
            return Err(ReelError::config(format!(
                "render format '{}' text box does not fit the frame",
                self.name
            )));
        }
        if self.parallax.iter().any(|c| !c.is_finite()) {
            return Err(ReelError::config(format!(
                "render format '{}' parallax coefficients must be finite",
                self.name
            )));
        }
        if self.sprite_scale == 0 {
            return Err(ReelError::config(format!(
                "render format '{}' sprite_scale must be >= 1",
                self.name
            )));
        }
        Ok(())
    }

    /// Left edge of the horizontally centred text box.
    pub fn text_box_x(&self) -> u32 {
        (self.width - self.text_box.width.min(self.width)) / 2
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/format.rs"]
mod tests;
