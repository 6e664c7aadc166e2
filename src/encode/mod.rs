//! Encoding: frame sinks, the `ffmpeg` encoder/muxer, and output probing.
//!
//! Frames travel from the compositor to the encoder's stdin one at a time; nothing per-frame is
//! ever written to disk.

/// `ffmpeg` video encoding and audio muxing.
pub mod ffmpeg;
/// Cancellation and wall-clock budget.
pub mod guard;
/// `ffprobe` measurement of finished files.
pub mod probe;
/// Frame sink trait and the in-memory sink.
pub mod sink;

use crate::encode::guard::RenderGuard;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::error::ReelResult;
use crate::render::raster::Frame;

/// Pull every frame from `frames` into `sink`, checking `guard` before each push.
///
/// Returns the number of frames written. On any failure the sink is aborted before the error is
/// returned.
pub fn stream_frames<I>(
    frames: I,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    guard: &RenderGuard,
) -> ReelResult<u64>
where
    I: IntoIterator<Item = ReelResult<Frame>>,
{
    let result = pump(frames, sink, cfg, guard);
    if let Err(e) = &result {
        tracing::debug!(error = %e, "aborting sink");
        sink.abort();
    }
    result
}

fn pump<I>(
    frames: I,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    guard: &RenderGuard,
) -> ReelResult<u64>
where
    I: IntoIterator<Item = ReelResult<Frame>>,
{
    guard.check()?;
    sink.begin(cfg)?;
    let mut written = 0u64;
    for frame in frames {
        guard.check()?;
        let frame = frame?;
        sink.push_frame(frame.index, &frame.raster)?;
        written += 1;
    }
    guard.check()?;
    sink.end()?;
    Ok(written)
}
