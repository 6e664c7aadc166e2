//! Frame-exact dialogue timing.
//!
//! All reveal arithmetic is done in floating point on `(char index, cps, fps)` and converted to
//! whole frames once, so the same inputs always produce the same frame counts.

use crate::config::TimingConfig;
use crate::foundation::core::Fps;
use crate::script::model::{Scene, Script};

const REVEAL_EPSILON: f64 = 1e-9;

/// Per-character reveal schedule of one dialogue line.
#[derive(Clone, Debug, PartialEq)]
pub struct RevealTimeline {
    char_count: usize,
    cps: f64,
    fps: Fps,
    reveal_frames: u64,
    hold_frames: u64,
}

impl RevealTimeline {
    /// Build the schedule for `char_count` characters.
    ///
    /// `cps` must be finite and positive and `hold_secs` finite and non-negative; script
    /// validation guarantees both.
    pub fn new(char_count: usize, cps: f64, hold_secs: f64, fps: Fps) -> Self {
        let reveal_frames = fps.secs_to_frames_ceil(char_count as f64 / cps);
        let hold_frames = fps.secs_to_frames_ceil(hold_secs.max(0.0));
        Self {
            char_count,
            cps,
            fps,
            reveal_frames,
            hold_frames,
        }
    }

    /// Schedule for `text`, counting Unicode scalar values.
    pub fn for_text(text: &str, cps: f64, hold_secs: f64, fps: Fps) -> Self {
        Self::new(text.chars().count(), cps, hold_secs, fps)
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// Reveal speed.
    pub fn cps(&self) -> f64 {
        self.cps
    }

    /// Frames spent revealing: `ceil(N / cps * fps)`.
    pub fn reveal_frames(&self) -> u64 {
        self.reveal_frames
    }

    /// Frames spent holding the full text: `ceil(hold * fps)`.
    pub fn hold_frames(&self) -> u64 {
        self.hold_frames
    }

    /// Frames the line occupies on screen. Never zero, so an empty line with no hold still
    /// yields one frame.
    pub fn total_frames(&self) -> u64 {
        (self.reveal_frames + self.hold_frames).max(1)
    }

    /// Visible characters at line-relative frame `frame`: `floor(t * cps)` clamped to N.
    pub fn visible_at_frame(&self, frame: u64) -> usize {
        let elapsed = self.fps.frames_to_secs(frame);
        let n = (elapsed * self.cps + REVEAL_EPSILON).floor().max(0.0);
        if n >= self.char_count as f64 {
            self.char_count
        } else {
            n as usize
        }
    }

    /// First line-relative frame at which character `k` (0-based) is visible.
    ///
    /// Exactly consistent with [`Self::visible_at_frame`].
    pub fn reveal_frame_of(&self, k: usize) -> u64 {
        if k >= self.char_count {
            return self.reveal_frames;
        }
        let need = k + 1;
        let estimate = ((need as f64) / self.cps * self.fps.as_f64()).ceil().max(0.0) as u64;
        let mut f = estimate;
        while self.visible_at_frame(f) < need {
            f += 1;
        }
        while f > 0 && self.visible_at_frame(f - 1) >= need {
            f -= 1;
        }
        f
    }

    /// Reveal frame of every character, in order.
    pub fn reveal_frames_per_char(&self) -> Vec<u64> {
        (0..self.char_count).map(|k| self.reveal_frame_of(k)).collect()
    }

    /// Reveal timestamp (seconds from line start) of every character, in order.
    pub fn reveal_times_secs(&self) -> Vec<f64> {
        self.reveal_frames_per_char()
            .into_iter()
            .map(|f| self.fps.frames_to_secs(f))
            .collect()
    }
}

/// Placement of one dialogue line inside its scene.
#[derive(Clone, Debug, PartialEq)]
pub struct LineTiming {
    /// Index of the line in `scene.dialogue`.
    pub index: usize,
    /// Speaker identifier.
    pub speaker: String,
    /// First frame, relative to scene start.
    pub start_frame: u64,
    /// Reveal schedule.
    pub timeline: RevealTimeline,
}

impl LineTiming {
    /// Exclusive end frame, relative to scene start.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.timeline.total_frames()
    }

    /// Whether scene-relative `frame` falls inside this line.
    pub fn contains(&self, frame: u64) -> bool {
        self.start_frame <= frame && frame < self.end_frame()
    }
}

/// Timing of one scene after the auto-extend policy.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneTiming {
    /// Dialogue placement.
    pub lines: Vec<LineTiming>,
    /// Frames from the authored duration.
    pub authored_frames: u64,
    /// Frames needed by lead-in, every line and the tail pad.
    pub required_frames: u64,
    /// `max(authored_frames, required_frames)`.
    pub effective_frames: u64,
}

impl SceneTiming {
    /// Compute timing for `scene`. Pure: identical inputs give identical results.
    pub fn compute(scene: &Scene, timing: &TimingConfig) -> Self {
        let fps = timing.fps;
        let mut cursor = fps.secs_to_frames_ceil(timing.lead_in_seconds);
        let mut lines = Vec::with_capacity(scene.dialogue.len());
        for (index, line) in scene.dialogue.iter().enumerate() {
            let cps = line.cps.unwrap_or(timing.cps);
            let hold = line.hold_seconds.unwrap_or(timing.hold_seconds);
            let timeline = RevealTimeline::for_text(line.text(), cps, hold, fps);
            let lt = LineTiming {
                index,
                speaker: line.character.clone(),
                start_frame: cursor,
                timeline,
            };
            cursor = lt.end_frame();
            lines.push(lt);
        }
        let required_frames = if lines.is_empty() {
            0
        } else {
            cursor + fps.secs_to_frames_ceil(timing.tail_seconds)
        };
        let authored_frames = fps.secs_to_frames_round(scene.authored_duration_secs());
        Self {
            lines,
            authored_frames,
            required_frames,
            effective_frames: authored_frames.max(required_frames).max(1),
        }
    }

    /// The line on screen at scene-relative `frame`, if any.
    pub fn active_line(&self, frame: u64) -> Option<&LineTiming> {
        self.lines.iter().find(|l| l.contains(frame))
    }

    /// Effective duration in seconds.
    pub fn effective_secs(&self, fps: Fps) -> f64 {
        fps.frames_to_secs(self.effective_frames)
    }
}

/// Timing of a whole episode: every scene back to back, then the end card.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeTiming {
    /// Frame rate the plan was computed at.
    pub fps: Fps,
    /// Per-scene timing.
    pub scenes: Vec<SceneTiming>,
    /// Absolute first frame of each scene.
    pub scene_starts: Vec<u64>,
    /// End-card frames.
    pub end_card_frames: u64,
}

impl EpisodeTiming {
    /// Plan the episode.
    pub fn plan(script: &Script, timing: &TimingConfig) -> Self {
        let mut scenes = Vec::with_capacity(script.scenes.len());
        let mut scene_starts = Vec::with_capacity(script.scenes.len());
        let mut cursor = 0u64;
        for scene in &script.scenes {
            let st = SceneTiming::compute(scene, timing);
            scene_starts.push(cursor);
            cursor += st.effective_frames;
            scenes.push(st);
        }
        let end_card_secs = script
            .end_card
            .duration_seconds
            .unwrap_or(timing.end_card_seconds);
        Self {
            fps: timing.fps,
            scenes,
            scene_starts,
            end_card_frames: timing.fps.secs_to_frames_round(end_card_secs),
        }
    }

    /// First frame of the end card.
    pub fn end_card_start(&self) -> u64 {
        self.scene_starts
            .last()
            .zip(self.scenes.last())
            .map(|(s, t)| s + t.effective_frames)
            .unwrap_or(0)
    }

    /// Total frames including the end card.
    pub fn total_frames(&self) -> u64 {
        self.end_card_start() + self.end_card_frames
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames())
    }

    /// Absolute `[start, end)` seconds of every dialogue line, in play order.
    pub fn dialogue_intervals_secs(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        for (scene, start) in self.scenes.iter().zip(&self.scene_starts) {
            for line in &scene.lines {
                out.push((
                    self.fps.frames_to_secs(start + line.start_frame),
                    self.fps.frames_to_secs(start + line.end_frame()),
                ));
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/timing.rs"]
mod tests;
