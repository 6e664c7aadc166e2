//! Scene compositor: backgrounds, sprites, and the dialogue box into finished frames.
//!
//! Frames are pulled one at a time. A scene is prepared (assets resolved, positions laid out,
//! dialogue wrapped) when the sequence reaches it, and its frames are produced on demand, so an
//! episode never exists in memory as more than one frame plus the current scene's assets.

use std::sync::Arc;

use crate::assets::store::{AssetStore, Background};
use crate::config::PipelineConfig;
use crate::foundation::core::{FrameIndex, Fps, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::positions::{Facing, LocationCatalog};
use crate::render::camera::{Viewport, viewport_at};
use crate::render::endcard::render_end_card;
use crate::render::format::RenderFormat;
use crate::render::raster::{Frame, Raster};
use crate::render::text::{PreparedDialogue, TextRenderer};
use crate::script::cast::CharacterCatalog;
use crate::script::model::{CameraSpec, Script};
use crate::script::timing::{EpisodeTiming, SceneTiming};

/// Read-only inputs shared by every render format of one run.
#[derive(Clone, Copy, Debug)]
pub struct RenderInputs<'a> {
    /// Validated script.
    pub script: &'a Script,
    /// Asset tree.
    pub assets: &'a AssetStore,
    /// Cast catalog.
    pub cast: &'a CharacterCatalog,
    /// Location position tables.
    pub locations: &'a LocationCatalog,
    /// Pipeline configuration.
    pub config: &'a PipelineConfig,
}

#[derive(Clone, Debug)]
struct PlacedCharacter {
    id: String,
    anchor: (i32, i32),
    rest: Arc<Raster>,
    talking: Option<Arc<Raster>>,
}

/// Everything needed to draw any frame of one scene.
#[derive(Debug)]
pub struct ScenePlan {
    index: usize,
    background: Background,
    characters: Vec<PlacedCharacter>,
    camera: Option<CameraSpec>,
    timing: SceneTiming,
    lines: Vec<PreparedDialogue>,
}

impl ScenePlan {
    /// Scene index in the script.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Scene timing.
    pub fn timing(&self) -> &SceneTiming {
        &self.timing
    }

    /// Background as resolved.
    pub fn background(&self) -> &Background {
        &self.background
    }
}

/// Composites frames for one render format.
#[derive(Debug)]
pub struct Compositor<'a> {
    inputs: RenderInputs<'a>,
    format: &'a RenderFormat,
    episode: EpisodeTiming,
    text: TextRenderer,
}

impl<'a> Compositor<'a> {
    /// Compositor for `format`. Loads the dialogue font once.
    pub fn new(inputs: RenderInputs<'a>, format: &'a RenderFormat) -> Self {
        let cfg = inputs.config;
        let font = inputs.assets.load_font(&cfg.text.font_file);
        let text = TextRenderer::new(
            cfg.text.clone(),
            font.as_deref().map(Vec::as_slice),
            inputs.assets.warnings(),
        );
        Self {
            inputs,
            format,
            episode: EpisodeTiming::plan(inputs.script, &cfg.timing),
            text,
        }
    }

    /// Episode timing the compositor follows.
    pub fn episode_timing(&self) -> &EpisodeTiming {
        &self.episode
    }

    /// Render format.
    pub fn format(&self) -> &RenderFormat {
        self.format
    }

    fn fps(&self) -> Fps {
        self.episode.fps
    }

    /// Resolve every scene's character positions without loading any pixels.
    ///
    /// Layout errors are fatal, so this runs before the first frame is produced.
    pub fn check_layout(&self) -> ReelResult<()> {
        for scene in &self.inputs.script.scenes {
            self.inputs
                .locations
                .resolve_scene(scene, self.format, self.inputs.assets.warnings())?;
        }
        Ok(())
    }

    /// Resolve assets, positions, and dialogue for scene `index`.
    #[tracing::instrument(skip(self), fields(format = %self.format.name))]
    pub fn prepare_scene(&mut self, index: usize) -> ReelResult<ScenePlan> {
        let inputs = self.inputs;
        let scene = inputs.script.scenes.get(index).ok_or_else(|| {
            ReelError::script(format!("scenes[{index}]"), "scene index out of range")
        })?;
        let timing = self
            .episode
            .scenes
            .get(index)
            .cloned()
            .unwrap_or_else(|| SceneTiming::compute(scene, &inputs.config.timing));

        let background = inputs.assets.load_background(&scene.background, self.format);
        let placed = inputs
            .locations
            .resolve_scene(scene, self.format, inputs.assets.warnings())?;

        let scale = self.format.sprite_scale.max(1);
        let mut characters = Vec::with_capacity(placed.len());
        for (id, pos) in placed {
            let prepare = |img: Arc<Raster>| -> Arc<Raster> {
                let mut out = img.scale_integer(scale);
                if pos.facing == Facing::Left {
                    out = out.mirrored();
                }
                Arc::new(out)
            };
            let rest = prepare(inputs.assets.load_sprite(&id, scene.animation_for(&id)));
            let speaks = scene.dialogue.iter().any(|l| l.character == id);
            let talking = speaks.then(|| prepare(inputs.assets.load_sprite(&id, "talking")));
            characters.push(PlacedCharacter {
                id,
                anchor: (pos.x, pos.y),
                rest,
                talking,
            });
        }

        let lines = scene
            .dialogue
            .iter()
            .map(|line| {
                self.text.prepare(
                    &inputs.cast.display_name(&line.character),
                    inputs.cast.name_color(&line.character),
                    line.text(),
                    &self.format.text_box,
                )
            })
            .collect();

        tracing::debug!(
            scene = index,
            frames = timing.effective_frames,
            characters = characters.len(),
            "scene prepared"
        );
        Ok(ScenePlan {
            index,
            background,
            characters,
            camera: scene.camera,
            timing,
            lines,
        })
    }

    /// Draw scene-relative frame `local` of a prepared scene.
    pub fn render_scene_frame(&mut self, plan: &mut ScenePlan, local: u64) -> ReelResult<Raster> {
        let fps = self.fps();
        let (w, h) = (self.format.width, self.format.height);
        let viewport = viewport_at(
            plan.camera.as_ref(),
            fps.frames_to_secs(local),
            plan.timing.effective_secs(fps),
        );

        let mut frame = Raster::filled(w, h, Rgba8::rgb(0, 0, 0));
        draw_background(&mut frame, &plan.background, viewport)?;

        let active = plan.timing.active_line(local).cloned();
        let speaker = active.as_ref().map(|l| l.speaker.as_str());
        for c in &plan.characters {
            let sprite = match (&c.talking, speaker) {
                (Some(t), Some(s)) if s == c.id => t,
                _ => &c.rest,
            };
            let (x, y) = sprite_origin(c.anchor, sprite, w, h);
            frame.draw_over(sprite, x, y);
        }

        if let Some(line) = active {
            let visible = line.timeline.visible_at_frame(local - line.start_frame);
            if let Some(prepared) = plan.lines.get_mut(line.index) {
                let text_box = self.text.render_box(prepared, visible)?;
                frame.draw_over(
                    text_box,
                    self.format.text_box_x() as i32,
                    self.format.text_box.y as i32,
                );
            }
        }
        Ok(frame)
    }

    /// Lazy frames of scene `index`, numbered from the scene's first frame.
    pub fn compose_scene(&mut self, index: usize) -> ReelResult<SceneFrames<'_, 'a>> {
        let plan = self.prepare_scene(index)?;
        let start = self.episode.scene_starts.get(index).copied().unwrap_or(0);
        Ok(SceneFrames {
            compositor: self,
            plan,
            start,
            next: 0,
        })
    }

    /// Draw the static end card.
    pub fn render_end_card(&mut self) -> ReelResult<Raster> {
        let template = self.inputs.assets.load_endcard_template();
        render_end_card(
            self.inputs.script,
            self.format,
            &self.inputs.config.end_card,
            template.as_deref(),
            &mut self.text,
        )
    }

    /// Single composited frame of scene `index` at `time_secs` into the scene.
    pub fn render_at(&mut self, index: usize, time_secs: f64) -> ReelResult<Raster> {
        let mut plan = self.prepare_scene(index)?;
        let last = plan.timing.effective_frames.saturating_sub(1);
        let local = self.fps().secs_to_frames_floor(time_secs.max(0.0)).min(last);
        self.render_scene_frame(&mut plan, local)
    }

    /// Every frame of the episode in presentation order: all scenes, then the end card.
    pub fn into_episode_frames(self) -> ReelResult<EpisodeFrames<'a>> {
        self.check_layout()?;
        Ok(EpisodeFrames {
            total: self.episode.total_frames(),
            compositor: self,
            scene: 0,
            plan: None,
            end_card: None,
            next: 0,
            failed: false,
        })
    }
}

fn draw_background(frame: &mut Raster, bg: &Background, viewport: Viewport) -> ReelResult<()> {
    let (w, h) = (frame.width, frame.height);
    for layer in &bg.layers {
        let offset = viewport.parallax_offset(layer.coefficient);
        if offset.x == 0.0 && offset.y == 0.0 && viewport.zoom == 1.0 {
            frame.composite_over(&layer.raster)?;
        } else {
            let sampled = layer.raster.sample_viewport(w, h, offset, viewport.zoom);
            frame.composite_over(&sampled)?;
        }
    }
    Ok(())
}

/// Top-left corner for a sprite anchored at its bottom centre, kept inside the frame.
fn sprite_origin(anchor: (i32, i32), sprite: &Raster, w: u32, h: u32) -> (i32, i32) {
    let sw = sprite.width as i32;
    let sh = sprite.height as i32;
    let x = anchor.0 - sw / 2;
    let y = anchor.1 - sh;
    let max_x = (w as i32 - sw).max(0);
    let max_y = (h as i32 - sh).max(0);
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

/// Lazy frames of one scene. Single forward pass.
#[derive(Debug)]
pub struct SceneFrames<'c, 'a> {
    compositor: &'c mut Compositor<'a>,
    plan: ScenePlan,
    start: u64,
    next: u64,
}

impl Iterator for SceneFrames<'_, '_> {
    type Item = ReelResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.plan.timing.effective_frames {
            return None;
        }
        let local = self.next;
        self.next += 1;
        let index = self.start + local;
        let time_secs = self.compositor.fps().frames_to_secs(index);
        Some(
            self.compositor
                .render_scene_frame(&mut self.plan, local)
                .map(|raster| Frame {
                    index: FrameIndex(index),
                    time_secs,
                    raster,
                }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.plan.timing.effective_frames.saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

/// Lazy frames of a whole episode. Stops after the first error.
#[derive(Debug)]
pub struct EpisodeFrames<'a> {
    compositor: Compositor<'a>,
    total: u64,
    scene: usize,
    plan: Option<ScenePlan>,
    end_card: Option<Raster>,
    next: u64,
    failed: bool,
}

impl EpisodeFrames<'_> {
    /// Total frames the sequence yields.
    pub fn total_frames(&self) -> u64 {
        self.total
    }

    fn produce(&mut self, index: u64) -> ReelResult<Raster> {
        loop {
            let episode = &self.compositor.episode;
            let (Some(&start), Some(timing)) = (
                episode.scene_starts.get(self.scene),
                episode.scenes.get(self.scene),
            ) else {
                break;
            };
            if index < start + timing.effective_frames {
                if self.plan.as_ref().is_none_or(|p| p.index != self.scene) {
                    // Drop the previous scene's assets before loading the next.
                    self.plan = None;
                    self.plan = Some(self.compositor.prepare_scene(self.scene)?);
                }
                return match self.plan.as_mut() {
                    Some(plan) => self.compositor.render_scene_frame(plan, index - start),
                    None => Err(ReelError::asset("scene plan missing")),
                };
            }
            self.scene += 1;
            self.plan = None;
        }
        if self.end_card.is_none() {
            self.end_card = Some(self.compositor.render_end_card()?);
        }
        self.end_card
            .clone()
            .ok_or_else(|| ReelError::asset("end card missing"))
    }
}

impl Iterator for EpisodeFrames<'_> {
    type Item = ReelResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let time_secs = self.compositor.fps().frames_to_secs(index);
        let out = self.produce(index).map(|raster| Frame {
            index: FrameIndex(index),
            time_secs,
            raster,
        });
        if out.is_err() {
            self.failed = true;
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total.saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
