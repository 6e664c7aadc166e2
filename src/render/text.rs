//! Typewriter dialogue box.
//!
//! Text is shaped with Parley and drawn with `vello_cpu` into a box-sized pixmap. Word wrapping
//! is computed once from the full line so the break positions never move while the text reveals.

use crate::config::TextStyle;
use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::warnings::{AssetKind, Component, WarningLog};
use crate::render::format::TextBoxGeometry;
use crate::render::raster::Raster;
use crate::script::timing::RevealTimeline;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<Rgba8> for TextBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// One wrapped row of a dialogue line: a byte range of the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedRow {
    /// Byte range in the source text.
    pub bytes: std::ops::Range<usize>,
    /// Index of the row's first character in the source text.
    pub first_char: usize,
    /// Characters in the row.
    pub char_len: usize,
}

/// A dialogue line shaped for one box geometry, with the last rendered frame cached.
#[derive(Clone, Debug)]
pub struct PreparedDialogue {
    speaker_name: String,
    name_color: Rgba8,
    text: String,
    rows: Vec<WrappedRow>,
    width: u32,
    height: u32,
    last: Option<(usize, Raster)>,
}

impl PreparedDialogue {
    /// Wrapped rows, top to bottom.
    pub fn rows(&self) -> &[WrappedRow] {
        &self.rows
    }

    /// Source text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Renders dialogue boxes for every visible-character count of a line.
pub struct TextRenderer {
    style: TextStyle,
    font: Option<LoadedFont>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    ctx: Option<vello_cpu::RenderContext>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("font_file", &self.style.font_file)
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl TextRenderer {
    /// Create a renderer from raw font bytes.
    ///
    /// Without usable font bytes the box is still drawn but carries no glyphs; unparseable
    /// bytes are recorded as a font warning.
    pub fn new(style: TextStyle, font_bytes: Option<&[u8]>, warnings: &WarningLog) -> Self {
        let mut font_ctx = parley::FontContext::default();
        let font = font_bytes.and_then(|bytes| {
            let families = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
            let family = families
                .first()
                .and_then(|(id, _)| font_ctx.collection.family_name(*id))
                .map(str::to_string);
            match family {
                Some(family) => Some(LoadedFont {
                    family,
                    data: vello_cpu::peniko::FontData::new(
                        vello_cpu::peniko::Blob::from(bytes.to_vec()),
                        0,
                    ),
                }),
                None => {
                    warnings.push_once(
                        Component::Text,
                        AssetKind::Font,
                        style.font_file.clone(),
                        "font file contains no usable font family; dialogue drawn without glyphs",
                    );
                    None
                }
            }
        });
        Self {
            style,
            font,
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            ctx: None,
        }
    }

    /// Whether glyphs can be drawn.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Style in use.
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Shape `text` for a box of `geometry` and compute its word wrap.
    pub fn prepare(
        &mut self,
        speaker_name: &str,
        name_color: Rgba8,
        text: &str,
        geometry: &TextBoxGeometry,
    ) -> PreparedDialogue {
        let inner = geometry.width.saturating_sub(2 * self.style.padding_px) as f32;
        let rows = self.wrap(text, self.style.font_size_px, inner);
        PreparedDialogue {
            speaker_name: speaker_name.to_string(),
            name_color,
            text: text.to_string(),
            rows,
            width: geometry.width,
            height: geometry.height,
            last: None,
        }
    }

    /// Box showing the first `visible` characters of a prepared line.
    ///
    /// Consecutive calls with the same count return the cached raster.
    pub fn render_box<'p>(
        &mut self,
        prepared: &'p mut PreparedDialogue,
        visible: usize,
    ) -> ReelResult<&'p Raster> {
        let stale = !matches!(&prepared.last, Some((v, _)) if *v == visible);
        if stale {
            let raster = self.draw_box(prepared, visible)?;
            prepared.last = Some((visible, raster));
        }
        match &prepared.last {
            Some((_, raster)) => Ok(raster),
            None => Err(ReelError::asset("dialogue box cache is empty")),
        }
    }

    /// Frames for a whole dialogue line plus its reveal timeline.
    ///
    /// The frame sequence is lazy: each item is rendered when pulled. Empty text yields only
    /// hold-phase frames (at least one).
    #[allow(clippy::too_many_arguments)]
    pub fn render_dialogue<'a>(
        &'a mut self,
        speaker_name: &str,
        name_color: Rgba8,
        text: &str,
        cps: f64,
        hold_secs: f64,
        fps: Fps,
        geometry: &TextBoxGeometry,
    ) -> (DialogueFrames<'a>, RevealTimeline) {
        let timeline = RevealTimeline::for_text(text, cps, hold_secs, fps);
        let prepared = self.prepare(speaker_name, name_color, text, geometry);
        let frames = DialogueFrames {
            renderer: self,
            prepared,
            timeline: timeline.clone(),
            next: 0,
        };
        (frames, timeline)
    }

    /// Greedy word wrap of `text` at `size_px` into rows no wider than `max_width`.
    ///
    /// A single word wider than the limit gets a row of its own. Without a font nothing can be
    /// measured and each paragraph stays on one row.
    pub fn wrap(&mut self, text: &str, size_px: f32, max_width: f32) -> Vec<WrappedRow> {
        let mut rows = Vec::new();
        let mut char_base = 0usize;
        let mut byte_base = 0usize;
        for para in text.split('\n') {
            self.wrap_paragraph(para, byte_base, char_base, size_px, max_width, &mut rows);
            char_base += para.chars().count() + 1;
            byte_base += para.len() + 1;
        }
        rows
    }

    fn wrap_paragraph(
        &mut self,
        para: &str,
        byte_base: usize,
        char_base: usize,
        size_px: f32,
        max_width: f32,
        rows: &mut Vec<WrappedRow>,
    ) {
        // (byte_start, byte_end, char_start) of each whitespace-separated word.
        let mut words: Vec<(usize, usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for (ci, (bi, ch)) in para.char_indices().enumerate() {
            if ch.is_whitespace() {
                if let Some((bs, cs)) = current.take() {
                    words.push((bs, bi, cs));
                }
            } else if current.is_none() {
                current = Some((bi, ci));
            }
        }
        if let Some((bs, cs)) = current {
            words.push((bs, para.len(), cs));
        }

        let mut row: Option<(usize, usize, usize)> = None;
        for (bs, be, cs) in words {
            row = match row {
                None => Some((bs, be, cs)),
                Some((rs, re, rc)) => {
                    let candidate = &para[rs..be];
                    if self.measure(candidate, size_px) <= max_width {
                        Some((rs, be, rc))
                    } else {
                        rows.push(make_row(para, byte_base, char_base, rs, re, rc));
                        Some((bs, be, cs))
                    }
                }
            };
        }
        if let Some((rs, re, rc)) = row {
            rows.push(make_row(para, byte_base, char_base, rs, re, rc));
        }
    }

    /// Rendered width of `text` on one line; zero without a font.
    pub fn measure(&mut self, text: &str, size_px: f32) -> f32 {
        self.shape(text, size_px, TextBrush::default())
            .map(|l| l.width())
            .unwrap_or(0.0)
    }

    /// Render `text` on one line into a tight raster, or `None` without a font or for empty
    /// text.
    pub fn render_label(
        &mut self,
        text: &str,
        size_px: f32,
        color: Rgba8,
    ) -> ReelResult<Option<Raster>> {
        let Some(layout) = self.shape(text, size_px, TextBrush::from(color)) else {
            return Ok(None);
        };
        let w = layout.width().ceil() as u32;
        let h = layout.height().ceil() as u32;
        if w == 0 || h == 0 {
            return Ok(None);
        }
        let w16 = u16::try_from(w)
            .map_err(|_| ReelError::config(format!("label width {w} exceeds u16")))?;
        let h16 = u16::try_from(h)
            .map_err(|_| ReelError::config(format!("label height {h} exceeds u16")))?;
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        self.draw_text(&mut ctx, text, size_px, color, (0.0, 0.0));
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        Raster::from_premul(w, h, pixmap.data_as_u8_slice().to_vec()).map(Some)
    }

    fn shape(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrush,
    ) -> Option<parley::Layout<TextBrush>> {
        let family = self.font.as_ref()?.family.clone();
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Some(layout)
    }

    fn draw_box(&mut self, prepared: &PreparedDialogue, visible: usize) -> ReelResult<Raster> {
        let (w, h) = (prepared.width, prepared.height);
        let mut out = Raster::filled(w, h, self.style.box_color);
        out.stroke_rect(0, 0, w, h, self.style.border_px, self.style.border_color);
        if self.font.is_none() || w == 0 || h == 0 {
            return Ok(out);
        }

        let w16 = u16::try_from(w)
            .map_err(|_| ReelError::config(format!("text box width {w} exceeds u16")))?;
        let h16 = u16::try_from(h)
            .map_err(|_| ReelError::config(format!("text box height {h} exceeds u16")))?;

        let pad = f64::from(self.style.padding_px);
        let name_size = self.style.name_size_px;
        let text_size = self.style.font_size_px;
        let text_top = pad * 2.0 + f64::from(name_size);
        let step = f64::from(text_size + self.style.line_gap_px);

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();

        self.draw_text(
            &mut ctx,
            &prepared.speaker_name,
            name_size,
            prepared.name_color,
            (pad, pad),
        );
        for (i, row) in prepared.rows.iter().enumerate() {
            let shown = visible.saturating_sub(row.first_char).min(row.char_len);
            if shown == 0 {
                break;
            }
            let segment: String = prepared.text[row.bytes.clone()]
                .chars()
                .take(shown)
                .collect();
            let y = text_top + step * i as f64;
            self.draw_text(&mut ctx, &segment, text_size, self.style.text_color, (pad, y));
        }

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        let glyphs = Raster::from_premul(w, h, pixmap.data_as_u8_slice().to_vec())?;
        out.composite_over(&glyphs)?;
        Ok(out)
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f32,
        color: Rgba8,
        origin: (f64, f64),
    ) {
        let Some(layout) = self.shape(text, size_px, TextBrush::from(color)) else {
            return;
        };
        let Some(font) = self.font.as_ref() else {
            return;
        };
        ctx.set_transform(vello_cpu::kurbo::Affine::translate(origin));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

fn make_row(
    para: &str,
    byte_base: usize,
    char_base: usize,
    start: usize,
    end: usize,
    first_char: usize,
) -> WrappedRow {
    WrappedRow {
        bytes: (byte_base + start)..(byte_base + end),
        first_char: char_base + first_char,
        char_len: para[start..end].chars().count(),
    }
}

/// Lazy per-frame dialogue boxes produced by [`TextRenderer::render_dialogue`].
pub struct DialogueFrames<'a> {
    renderer: &'a mut TextRenderer,
    prepared: PreparedDialogue,
    timeline: RevealTimeline,
    next: u64,
}

impl DialogueFrames<'_> {
    /// Word wrap of the line.
    pub fn rows(&self) -> &[WrappedRow] {
        self.prepared.rows()
    }
}

impl Iterator for DialogueFrames<'_> {
    type Item = ReelResult<Raster>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.timeline.total_frames() {
            return None;
        }
        let visible = self.timeline.visible_at_frame(self.next);
        self.next += 1;
        Some(
            self.renderer
                .render_box(&mut self.prepared, visible)
                .cloned(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.timeline.total_frames().saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
