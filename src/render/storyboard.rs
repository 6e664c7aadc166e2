use crate::foundation::core::Rgba8;
use crate::foundation::error::ReelResult;
use crate::render::compositor::{Compositor, RenderInputs};
use crate::render::format::RenderFormat;
use crate::render::raster::Raster;

/// Thumbnails per storyboard row.
pub const STORYBOARD_COLUMNS: u32 = 3;
/// Thumbnail size as a divisor of the frame size.
pub const THUMB_DIVISOR: u32 = 4;
/// Gap around and between thumbnails.
pub const THUMB_GAP_PX: u32 = 8;

/// Contact sheet with one thumbnail per scene, left to right, top to bottom.
///
/// Each thumbnail is the frame at which the scene's first dialogue line starts (the scene's first
/// frame when it has no dialogue), downscaled by nearest neighbour.
#[tracing::instrument(skip(inputs, format), fields(format = %format.name))]
pub fn render_storyboard(
    inputs: RenderInputs<'_>,
    format: &RenderFormat,
) -> ReelResult<image::RgbaImage> {
    let mut compositor = Compositor::new(inputs, format);
    compositor.check_layout()?;

    let tw = (format.width / THUMB_DIVISOR).max(1);
    let th = (format.height / THUMB_DIVISOR).max(1);
    let count = inputs.script.scenes.len() as u32;
    let cols = count.clamp(1, STORYBOARD_COLUMNS);
    let rows = count.div_ceil(STORYBOARD_COLUMNS).max(1);
    let sheet_w = cols * tw + (cols + 1) * THUMB_GAP_PX;
    let sheet_h = rows * th + (rows + 1) * THUMB_GAP_PX;
    let mut sheet = Raster::filled(sheet_w, sheet_h, Rgba8::rgb(16, 16, 24));

    for index in 0..inputs.script.scenes.len() {
        let mut plan = compositor.prepare_scene(index)?;
        let local = plan
            .timing()
            .lines
            .first()
            .map(|l| l.start_frame)
            .unwrap_or(0);
        let frame = compositor.render_scene_frame(&mut plan, local)?;
        let thumb = frame.scale_nearest(tw, th);
        let i = index as u32;
        let x = THUMB_GAP_PX + (i % STORYBOARD_COLUMNS) * (tw + THUMB_GAP_PX);
        let y = THUMB_GAP_PX + (i / STORYBOARD_COLUMNS) * (th + THUMB_GAP_PX);
        sheet.draw_over(&thumb, x as i32, y as i32);
    }
    sheet.to_rgba_image()
}

#[cfg(test)]
#[path = "../../tests/unit/render/storyboard.rs"]
mod tests;
