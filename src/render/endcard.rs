use crate::config::EndCardStyle;
use crate::foundation::error::ReelResult;
use crate::render::format::RenderFormat;
use crate::render::raster::Raster;
use crate::render::text::TextRenderer;
use crate::script::model::Script;

/// Horizontal margin kept free on each side of the wrapped title.
const TITLE_MARGIN_PX: u32 = 200;
/// Vertical step between wrapped title rows.
const TITLE_STEP_PX: i32 = 30;

/// Render the static end card for `format`.
///
/// Layout, relative to the frame's vertical centre `c`: episode id at `c - 80`, title rows from
/// `c - 40`, branding line at `c + 80`, optional end-card text at `c + 110`. Every line is
/// horizontally centred. The card is not camera-driven, so one raster serves every end-card
/// frame.
pub fn render_end_card(
    script: &Script,
    format: &RenderFormat,
    style: &EndCardStyle,
    template: Option<&Raster>,
    text: &mut TextRenderer,
) -> ReelResult<Raster> {
    let (w, h) = (format.width, format.height);
    let mut card = match template {
        Some(t) => t.scale_nearest(w, h),
        None => Raster::filled(w, h, style.background),
    };
    let center_y = (h / 2) as i32;

    if !script.episode_id.is_empty() {
        let label = text.render_label(&script.episode_id, style.id_size_px, style.text_color)?;
        draw_centred(&mut card, label.as_ref(), center_y - 80);
    }

    let title_width = w.saturating_sub(2 * TITLE_MARGIN_PX) as f32;
    let rows = text.wrap(&script.title, style.title_size_px, title_width);
    for (i, row) in rows.iter().enumerate() {
        let line = &script.title[row.bytes.clone()];
        let label = text.render_label(line, style.title_size_px, style.text_color)?;
        draw_centred(&mut card, label.as_ref(), center_y - 40 + TITLE_STEP_PX * i as i32);
    }

    let brand = text.render_label(&style.brand_text, style.brand_size_px, style.brand_color)?;
    draw_centred(&mut card, brand.as_ref(), center_y + 80);

    if let Some(extra) = script.end_card.text.as_deref().filter(|t| !t.is_empty()) {
        let label = text.render_label(extra, style.id_size_px, style.text_color)?;
        draw_centred(&mut card, label.as_ref(), center_y + 110);
    }
    Ok(card)
}

fn draw_centred(card: &mut Raster, label: Option<&Raster>, top: i32) {
    let Some(label) = label else {
        return;
    };
    let x = (i64::from(card.width) - i64::from(label.width)) / 2;
    card.draw_over(label, x as i32, top);
}

#[cfg(test)]
#[path = "../../tests/unit/render/endcard.rs"]
mod tests;
