use std::path::Path;
use std::process::{Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Measured properties of an encoded container.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaProbe {
    /// Width of the first video stream.
    pub width: u32,
    /// Height of the first video stream.
    pub height: u32,
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Whether at least one audio stream is present.
    pub has_audio: bool,
    /// File size on disk.
    pub size_bytes: u64,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe `path` through `ffprobe`.
#[tracing::instrument]
pub fn probe_media(path: &Path) -> ReelResult<MediaProbe> {
    let size_bytes = std::fs::metadata(path)
        .map_err(|e| ReelError::encoder(format!("cannot stat '{}': {e}", path.display())))?
        .len();
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ReelError::encoder(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::encoder(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout, size_bytes)
}

/// Interpret `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(json: &[u8], size_bytes: u64) -> ReelResult<MediaProbe> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ReelError::serde(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::encoder("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| ReelError::encoder("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| ReelError::encoder("missing video height from ffprobe"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    // Container duration first; fall back to the video stream's own.
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ReelError::encoder("missing duration from ffprobe"))?;

    Ok(MediaProbe {
        width,
        height,
        duration_secs,
        has_audio,
        size_bytes,
    })
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/probe.rs"]
mod tests;
