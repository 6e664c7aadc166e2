use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::EncodeConfig;
use crate::encode::guard::RenderGuard;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::encode::stream_frames;
use crate::foundation::core::{Fps, FrameIndex, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::warnings::{AssetKind, Component, WarningLog};
use crate::render::raster::{Frame, Raster};

const WAIT_POLL: Duration = Duration::from_millis(5);

/// Options for [`FfmpegSink`] video-only output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Encoder executable.
    pub program: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background used to flatten alpha.
    pub bg: Rgba8,
    /// x264 constant rate factor.
    pub crf: u8,
    /// x264 preset.
    pub preset: String,
    /// Budget and cancellation enforced for the whole life of the encoder process.
    pub guard: Option<RenderGuard>,
}

impl FfmpegSinkOpts {
    /// Options for an MP4 at `out_path` with the default quality settings.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self::from_config(out_path, &EncodeConfig::default())
    }

    /// Options for an MP4 at `out_path` using `cfg`'s program and quality settings.
    pub fn from_config(out_path: impl Into<PathBuf>, cfg: &EncodeConfig) -> Self {
        Self {
            out_path: out_path.into(),
            program: cfg.ffmpeg_program.clone(),
            overwrite: true,
            bg: Rgba8::rgb(0, 0, 0),
            crf: cfg.crf,
            preset: cfg.preset.clone(),
            guard: None,
        }
    }
}

/// Sink that spawns `ffmpeg` and streams raw frames to its stdin.
///
/// Produces a video-only H.264 stream; audio is attached afterwards by [`mux_audio`]. The child
/// process is killed and reaped on `abort` and on drop. With a guard set, a watchdog thread kills
/// the child as soon as the guard trips, which also unblocks a frame write stuck on a full pipe.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Arc<Mutex<Child>>>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    watchdog: Option<Watchdog>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("out_path", &self.opts.out_path)
            .field("running", &self.child.is_some())
            .field("last_idx", &self.last_idx)
            .finish()
    }
}

impl FfmpegSink {
    /// Create a sink; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            watchdog: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn join_drain(&mut self) -> ReelResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encoder("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::encoder(format!("ffmpeg stderr read failed: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn stop_watchdog(&mut self) {
        if let Some(w) = self.watchdog.take() {
            w.stop();
        }
    }

    /// The guard's error when it has tripped, so a killed encoder reports why it died.
    fn guard_error(&self) -> ReelResult<()> {
        match self.opts.guard.as_ref() {
            Some(guard) => guard.check(),
            None => Ok(()),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::config("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::config("ffmpeg sink width/height must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::config(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ReelError::config(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_program_available(&self.opts.program) {
            return Err(ReelError::encoder(format!(
                "ffmpeg is required for MP4 encoding, but '{}' could not be run",
                self.opts.program.display()
            )));
        }

        let mut cmd = video_command(&cfg, &self.opts);
        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            "spawning ffmpeg"
        );
        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encoder("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encoder("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let child = Arc::new(Mutex::new(child));
        self.watchdog = self
            .opts
            .guard
            .clone()
            .map(|guard| Watchdog::spawn(Arc::clone(&child), guard));
        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Raster) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encoder("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encoder(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::encoder(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        frame.flatten_to_opaque(&mut self.scratch, self.opts.bg)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encoder("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&self.scratch) {
            self.guard_error()?;
            return Err(ReelError::encoder(format!(
                "failed to write frame to ffmpeg stdin: {e}"
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encoder("ffmpeg sink not started"))?;

        let status = wait_for_exit(&child);
        self.stop_watchdog();
        let stderr_bytes = self.join_drain()?;
        let status = status?;

        if !status.success() {
            self.guard_error()?;
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        self.stop_watchdog();
        if let Some(child) = self.child.take() {
            let mut child = lock_child(&child);
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_drain();
        self.cfg = None;
        if self.opts.out_path.exists() {
            let _ = std::fs::remove_file(&self.opts.out_path);
        }
        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg sink aborted");
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() || self.watchdog.is_some() {
            self.abort();
        }
    }
}

/// Kills a running encoder once its [`RenderGuard`] trips.
struct Watchdog {
    done: Arc<AtomicBool>,
    handle: std::thread::JoinHandle<()>,
}

impl Watchdog {
    fn spawn(child: Arc<Mutex<Child>>, guard: RenderGuard) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                if let Err(e) = guard.check() {
                    tracing::warn!(error = %e, "terminating ffmpeg");
                    let _ = lock_child(&child).kill();
                    return;
                }
                std::thread::sleep(WAIT_POLL);
            }
        });
        Self { done, handle }
    }

    fn stop(self) {
        self.done.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Poll `child` until it exits, releasing the lock between polls so the watchdog can kill it.
fn wait_for_exit(child: &Mutex<Child>) -> ReelResult<ExitStatus> {
    loop {
        let polled = lock_child(child).try_wait();
        match polled {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => std::thread::sleep(WAIT_POLL),
            Err(e) => {
                let mut child = lock_child(child);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ReelError::encoder(format!("failed to poll ffmpeg: {e}")));
            }
        }
    }
}

fn video_command(cfg: &SinkConfig, opts: &FfmpegSinkOpts) -> Command {
    let mut cmd = Command::new(&opts.program);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    if opts.overwrite {
        cmd.arg("-y");
    } else {
        cmd.arg("-n");
    }

    // Input: opaque RGBA8 frames, flattened in push_frame.
    cmd.args([
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
    ]);
    push_input_fps(&mut cmd, cfg.fps);
    cmd.args(["-i", "pipe:0"]);

    cmd.args([
        "-an",
        "-c:v",
        "libx264",
        "-preset",
        &opts.preset,
        "-crf",
        &opts.crf.to_string(),
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
    ]);
    cmd.arg(&opts.out_path);
    cmd
}

fn mux_command(video: &Path, audio: &AudioInputConfig, out: &Path, cfg: &EncodeConfig) -> Command {
    let mut cmd = Command::new(&cfg.ffmpeg_program);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd.args(["-y", "-loglevel", "error", "-i"])
        .arg(video)
        .args([
            "-f",
            "f32le",
            "-ar",
            &audio.sample_rate.to_string(),
            "-ac",
            &audio.channels.to_string(),
            "-i",
        ])
        .arg(&audio.path)
        .args([
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-b:a",
            &cfg.audio_bitrate,
            "-shortest",
            "-movflags",
            "+faststart",
        ])
        .arg(out);
    cmd
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Attach the mixed audio to an encoded video stream, copying the video and trimming to the
/// shorter stream.
#[tracing::instrument(skip(audio, cfg, guard), fields(video = %video.display()))]
pub fn mux_audio(
    video: &Path,
    audio: &AudioInputConfig,
    out: &Path,
    cfg: &EncodeConfig,
    guard: &RenderGuard,
) -> ReelResult<()> {
    if audio.sample_rate == 0 || audio.channels == 0 {
        return Err(ReelError::config(
            "audio sample_rate and channels must be non-zero",
        ));
    }
    ensure_parent_dir(out)?;
    let mut child = mux_command(video, audio, out, cfg)
        .spawn()
        .map_err(|e| ReelError::encoder(format!("failed to spawn ffmpeg for mux: {e}")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| ReelError::encoder("failed to open ffmpeg stderr (unexpected)"))?;
    let drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok::<_, std::io::Error>(bytes)
    });

    let status = wait_guarded(&mut child, guard);
    let stderr_bytes = drain
        .join()
        .map_err(|_| ReelError::encoder("ffmpeg stderr drain thread panicked"))?
        .unwrap_or_default();
    let status = status?;
    if !status.success() {
        return Err(ReelError::encoder(format!(
            "ffmpeg mux exited with status {}: {}",
            status,
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }
    Ok(())
}

/// Wait for `child`, killing and reaping it as soon as `guard` trips.
fn wait_guarded(child: &mut Child, guard: &RenderGuard) -> ReelResult<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ReelError::encoder(format!("failed to poll ffmpeg: {e}")));
            }
        }
        if let Err(e) = guard.check() {
            tracing::warn!(error = %e, "terminating ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
        std::thread::sleep(WAIT_POLL);
    }
}

/// One encode-and-mux pass for a single render format.
#[derive(Clone, Copy, Debug)]
pub struct EncodeJob<'a> {
    /// Final container path.
    pub out_path: &'a Path,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Frames the producer will yield.
    pub expected_frames: u64,
    /// Mixed audio to attach.
    pub audio: &'a AudioInputConfig,
    /// Encoder settings.
    pub config: &'a EncodeConfig,
    /// Budget and cancellation.
    pub guard: &'a RenderGuard,
    /// Run-scoped warning log.
    pub warnings: &'a WarningLog,
}

/// Stream `frames` through a video-only encode, then mux the audio.
///
/// Intermediate files live next to `out_path` under hidden `.partial` names and are removed on
/// every exit path; `out_path` itself only appears once the mux succeeded.
#[tracing::instrument(skip(frames, job), fields(out = %job.out_path.display()))]
pub fn encode_and_mux<I>(frames: I, job: EncodeJob<'_>) -> ReelResult<PathBuf>
where
    I: IntoIterator<Item = ReelResult<Frame>>,
{
    ensure_parent_dir(job.out_path)?;
    let video_tmp = partial_path(job.out_path, "video");
    let muxed_tmp = partial_path(job.out_path, "mux");

    let mut opts = FfmpegSinkOpts::from_config(&video_tmp, job.config);
    opts.guard = Some(job.guard.clone());
    let mut sink = FfmpegSink::new(opts);
    let written = stream_frames(
        frames,
        &mut sink,
        SinkConfig {
            width: job.width,
            height: job.height,
            fps: job.fps,
            expected_frames: job.expected_frames,
        },
        job.guard,
    )?;

    let video_secs = job.fps.frames_to_secs(written);
    let delta = (video_secs - job.audio.duration_secs).abs();
    if delta > job.config.mux_tolerance_seconds {
        let name = job
            .out_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        job.warnings.push(
            Component::Encoder,
            AssetKind::Mux,
            name,
            format!(
                "video {video_secs:.3}s and audio {:.3}s differ by {delta:.3}s; output trimmed to the shorter stream",
                job.audio.duration_secs
            ),
        );
    }

    let muxed = mux_audio(&video_tmp, job.audio, &muxed_tmp, job.config, job.guard);
    let _ = std::fs::remove_file(&video_tmp);
    if let Err(e) = muxed {
        let _ = std::fs::remove_file(&muxed_tmp);
        return Err(e);
    }

    use anyhow::Context as _;
    std::fs::rename(&muxed_tmp, job.out_path).with_context(|| {
        format!(
            "failed to move '{}' to '{}'",
            muxed_tmp.display(),
            job.out_path.display()
        )
    })?;
    tracing::info!(frames = written, seconds = video_secs, "encoded");
    Ok(job.out_path.to_path_buf())
}

/// Hidden sibling of `out` used for an unfinished artifact.
pub fn partial_path(out: &Path, tag: &str) -> PathBuf {
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out.with_file_name(format!(".{name}.{tag}.partial.mp4"))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_available(Path::new("ffmpeg"))
}

/// Return `true` when `program -version` runs successfully.
pub fn is_program_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
