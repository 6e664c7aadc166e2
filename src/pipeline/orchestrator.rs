use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::assets::store::{AssetStore, MissingAsset};
use crate::audio::manifest::build_manifest;
use crate::audio::mix::{MixedAudio, mix_manifest};
use crate::config::PipelineConfig;
use crate::encode::ffmpeg::{EncodeJob, encode_and_mux};
use crate::encode::guard::{CancelToken, RenderGuard};
use crate::encode::probe::{MediaProbe, probe_media};
use crate::encode::sink::AudioInputConfig;
use crate::foundation::error::ReelResult;
use crate::foundation::warnings::{Warning, WarningLog};
use crate::layout::positions::LocationCatalog;
use crate::pipeline::gate::{GateVerdict, evaluate_gate};
use crate::pipeline::state::{RenderPhase, RenderState, StateMachine};
use crate::render::compositor::{Compositor, RenderInputs};
use crate::render::format::RenderFormat;
use crate::script::cast::CharacterCatalog;
use crate::script::model::Script;
use crate::script::timing::EpisodeTiming;

/// One render invocation.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    /// Episode script.
    pub script: Script,
    /// Root of the asset tree.
    pub assets_root: PathBuf,
    /// Directory receiving one `<episode>_<format>.mp4` per format.
    pub out_dir: PathBuf,
    /// Format names to render; empty renders every configured format.
    pub formats: Vec<String>,
    /// Render formats concurrently.
    pub parallel: bool,
    /// Caller-held cancellation.
    pub cancel: CancelToken,
}

impl RenderRequest {
    /// Request for every configured format, sequentially.
    pub fn new(
        script: Script,
        assets_root: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            script,
            assets_root: assets_root.into(),
            out_dir: out_dir.into(),
            formats: Vec::new(),
            parallel: false,
            cancel: CancelToken::new(),
        }
    }
}

/// One finished output file.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FormatOutput {
    /// Render format name.
    pub format: String,
    /// Output container.
    pub path: PathBuf,
    /// Encode attempts used.
    pub attempts: u32,
    /// Measured properties; absent when probing failed.
    pub probe: Option<MediaProbe>,
    /// Quality gate outcome.
    pub verdict: GateVerdict,
}

/// Structured result of [`Orchestrator::render`].
#[derive(Clone, Debug, serde::Serialize)]
pub struct RenderReport {
    /// Episode id from the script.
    pub episode_id: String,
    /// Final state: `Done`, or `Failed` when an output missed the gate.
    pub state: RenderState,
    /// One entry per rendered format.
    pub outputs: Vec<FormatOutput>,
    /// Everything the run degraded on.
    pub warnings: Vec<Warning>,
    /// Advisory asset-check findings.
    pub missing_assets: Vec<MissingAsset>,
    /// Planned duration including the end card.
    pub planned_duration_secs: f64,
    /// Duration the gate compared against.
    pub target_duration_secs: f64,
}

impl RenderReport {
    /// Every output exists and passed the gate.
    pub fn passed(&self) -> bool {
        self.state == RenderState::Done && self.outputs.iter().all(|o| o.verdict.passed)
    }
}

/// Sequences asset checking, mixing, per-format encoding, and the quality gate.
#[derive(Debug)]
pub struct Orchestrator {
    config: PipelineConfig,
}

impl Orchestrator {
    /// Orchestrator with a validated configuration.
    pub fn new(config: PipelineConfig) -> ReelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render every requested format.
    ///
    /// Each call owns a fresh warning log, so concurrent renders on one orchestrator never see
    /// each other's warnings.
    ///
    /// Script, layout, encoder, timeout, and cancellation failures are returned as errors.
    /// Missing assets and quality-gate misses are not: they show up in the report.
    #[tracing::instrument(skip(self, req), fields(episode = %req.script.episode_id))]
    pub fn render(&self, req: &RenderRequest) -> ReelResult<RenderReport> {
        let mut machine = StateMachine::new();
        let started = Instant::now();
        match self.run(req, &mut machine) {
            Ok(report) => {
                tracing::info!(
                    passed = report.passed(),
                    outputs = report.outputs.len(),
                    warnings = report.warnings.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "render finished"
                );
                Ok(report)
            }
            Err(e) => {
                machine.fail(format!("{:?}", e.kind()));
                tracing::error!(error = %e, "render failed");
                Err(e)
            }
        }
    }

    fn run(&self, req: &RenderRequest, machine: &mut StateMachine) -> ReelResult<RenderReport> {
        let warnings = WarningLog::new();
        machine.advance(RenderState::AssetCheck)?;
        req.script.validate()?;
        let formats = select_formats(&self.config, &req.formats)?;

        let cast = CharacterCatalog::load(&req.assets_root)?;
        let locations = LocationCatalog::load(&req.assets_root)?;
        let store = AssetStore::new(&req.assets_root, warnings.clone());
        let missing = store.missing_assets(&req.script, &cast, &self.config);
        for m in &missing {
            tracing::info!(kind = ?m.kind, identifier = %m.identifier, "asset will fall back");
        }
        let inputs = RenderInputs {
            script: &req.script,
            assets: &store,
            cast: &cast,
            locations: &locations,
            config: &self.config,
        };
        for format in &formats {
            Compositor::new(inputs, format).check_layout()?;
        }

        let timing = EpisodeTiming::plan(&req.script, &self.config.timing);
        let planned = timing.duration_secs();
        let mixed = mix_episode(&req.script, &timing, &store, &cast, &self.config);

        let scratch_dir = self
            .config
            .scratch_dir
            .clone()
            .unwrap_or_else(|| req.out_dir.clone());
        use anyhow::Context as _;
        std::fs::create_dir_all(&scratch_dir)
            .with_context(|| format!("create scratch directory '{}'", scratch_dir.display()))?;
        std::fs::create_dir_all(&req.out_dir)
            .with_context(|| format!("create output directory '{}'", req.out_dir.display()))?;
        let scratch = tempfile::Builder::new()
            .prefix(".pixreel-mix-")
            .suffix(".f32le")
            .tempfile_in(&scratch_dir)
            .with_context(|| format!("create audio scratch in '{}'", scratch_dir.display()))?;
        mixed.write_f32le(scratch.path())?;
        let audio = AudioInputConfig {
            path: scratch.path().to_path_buf(),
            sample_rate: mixed.sample_rate,
            channels: mixed.channels,
            duration_secs: mixed.duration_secs(),
        };

        let rendered: Vec<(String, PathBuf, u32)> = {
            let progress = Mutex::new(&mut *machine);
            let advance = |next: RenderState| -> ReelResult<()> {
                progress
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .advance(next)
            };
            let encode_one = |format: &&RenderFormat| {
                self.render_format(inputs, format, &audio, req, &advance)
            };
            if req.parallel && formats.len() > 1 {
                formats.par_iter().map(encode_one).collect::<ReelResult<_>>()?
            } else {
                formats.iter().map(encode_one).collect::<ReelResult<_>>()?
            }
        };
        drop(scratch);

        machine.advance(RenderState::QualityGate)?;
        let target = req.script.target_duration_seconds.unwrap_or(planned);
        let outputs: Vec<FormatOutput> = rendered
            .into_iter()
            .map(|(format, path, attempts)| {
                let (probe, verdict) = match probe_media(&path) {
                    Ok(p) => {
                        let v =
                            evaluate_gate(&p, &self.config.formats, target, &self.config.quality);
                        (Some(p), v)
                    }
                    Err(e) => (
                        None,
                        GateVerdict {
                            passed: false,
                            issues: vec![format!("probe failed: {e}")],
                        },
                    ),
                };
                if !verdict.passed {
                    tracing::warn!(
                        format = %format,
                        issues = ?verdict.issues,
                        "quality gate failed"
                    );
                }
                FormatOutput {
                    format,
                    path,
                    attempts,
                    probe,
                    verdict,
                }
            })
            .collect();

        if outputs.iter().all(|o| o.verdict.passed) {
            machine.advance(RenderState::Done)?;
        } else {
            machine.fail("quality gate");
        }

        Ok(RenderReport {
            episode_id: req.script.episode_id.clone(),
            state: machine.current().clone(),
            outputs,
            warnings: warnings.snapshot(),
            missing_assets: missing,
            planned_duration_secs: planned,
            target_duration_secs: target,
        })
    }

    /// Encode one format, retrying transient encoder failures with backoff.
    #[tracing::instrument(skip(self, inputs, audio, req, advance), fields(format = %format.name))]
    fn render_format(
        &self,
        inputs: RenderInputs<'_>,
        format: &RenderFormat,
        audio: &AudioInputConfig,
        req: &RenderRequest,
        advance: &(dyn Fn(RenderState) -> ReelResult<()> + Sync),
    ) -> ReelResult<(String, PathBuf, u32)> {
        let enc = &self.config.encode;
        let guard = RenderGuard::new(req.cancel.clone(), enc.timeout_seconds);
        let out_path = output_path(&req.out_dir, &req.script.episode_id, &format.name);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            advance(RenderState::Rendering {
                format: format.name.clone(),
                phase: RenderPhase::Composing,
            })?;
            let compositor = Compositor::new(inputs, format);
            let expected = compositor.episode_timing().total_frames();
            let fps = compositor.episode_timing().fps;
            let frames = compositor.into_episode_frames()?;
            advance(RenderState::Rendering {
                format: format.name.clone(),
                phase: RenderPhase::Encoding,
            })?;
            tracing::info!(attempt, frames = expected, "encoding");

            let job = EncodeJob {
                out_path: &out_path,
                width: format.width,
                height: format.height,
                fps,
                expected_frames: expected,
                audio,
                config: enc,
                guard: &guard,
                warnings: inputs.assets.warnings(),
            };
            match encode_and_mux(frames, job) {
                Ok(path) => return Ok((format.name.clone(), path, attempt)),
                Err(e) if e.is_retryable() && attempt < enc.max_attempts => {
                    let wait = enc.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        error = %e,
                        backoff_ms = wait.as_millis() as u64,
                        "encoder failed; retrying"
                    );
                    sleep_guarded(wait, &guard)?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Mix the whole episode soundtrack.
pub fn mix_episode(
    script: &Script,
    timing: &EpisodeTiming,
    assets: &AssetStore,
    cast: &CharacterCatalog,
    config: &PipelineConfig,
) -> MixedAudio {
    let music = config.music.file_for(script);
    let manifest = build_manifest(script, timing, assets, cast, &config.audio, &music);
    mix_manifest(&manifest)
}

/// `<out_dir>/<episode>_<format>.mp4`, with path-hostile characters in the episode id replaced.
pub fn output_path(out_dir: &Path, episode_id: &str, format: &str) -> PathBuf {
    let safe: String = episode_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    out_dir.join(format!("{safe}_{format}.mp4"))
}

fn select_formats<'c>(
    cfg: &'c PipelineConfig,
    names: &[String],
) -> ReelResult<Vec<&'c RenderFormat>> {
    if names.is_empty() {
        return Ok(cfg.formats.iter().collect());
    }
    let mut out: Vec<&RenderFormat> = Vec::with_capacity(names.len());
    for name in names {
        let f = cfg.format(name)?;
        if !out.iter().any(|o| o.name == f.name) {
            out.push(f);
        }
    }
    Ok(out)
}

fn sleep_guarded(total: Duration, guard: &RenderGuard) -> ReelResult<()> {
    let until = Instant::now() + total;
    while Instant::now() < until {
        guard.check()?;
        let left = until.saturating_duration_since(Instant::now());
        std::thread::sleep(Duration::from_millis(10).min(left));
    }
    guard.check()
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
