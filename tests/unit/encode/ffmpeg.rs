use super::*;
use crate::encode::guard::CancelToken;
use std::ffi::OsStr;

fn args(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a: &OsStr| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn video_command_streams_raw_rgba_into_x264() {
    let cfg = SinkConfig {
        width: 1080,
        height: 1920,
        fps: Fps::new(30000, 1001).unwrap(),
        expected_frames: 10,
    };
    let opts = FfmpegSinkOpts::new("/tmp/out.mp4");
    let a = args(&video_command(&cfg, &opts));
    let joined = a.join(" ");
    assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1080x1920 -r 30000/1001 -i pipe:0"));
    assert!(joined.contains("-an -c:v libx264 -preset medium -crf 18 -pix_fmt yuv420p"));
    assert_eq!(a.last().map(String::as_str), Some("/tmp/out.mp4"));
}

#[test]
fn mux_command_copies_video_and_encodes_aac() {
    let audio = AudioInputConfig {
        path: PathBuf::from("/tmp/mix.f32le"),
        sample_rate: 48_000,
        channels: 2,
        duration_secs: 3.0,
    };
    let cfg = EncodeConfig::default();
    let a = args(&mux_command(
        Path::new("/tmp/v.mp4"),
        &audio,
        Path::new("/tmp/final.mp4"),
        &cfg,
    ));
    let joined = a.join(" ");
    assert!(joined.contains("-i /tmp/v.mp4 -f f32le -ar 48000 -ac 2 -i /tmp/mix.f32le"));
    assert!(joined.contains("-c:v copy -c:a aac -b:a 128k -shortest"));
    assert_eq!(a.last().map(String::as_str), Some("/tmp/final.mp4"));
}

#[test]
fn partial_paths_are_hidden_siblings() {
    let p = partial_path(Path::new("/out/ep1_vertical.mp4"), "video");
    assert_eq!(p, PathBuf::from("/out/.ep1_vertical.mp4.video.partial.mp4"));
}

#[test]
fn odd_dimensions_are_rejected_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(dir.path().join("x.mp4")));
    let err = sink
        .begin(SinkConfig {
            width: 3,
            height: 2,
            fps: Fps::default(),
            expected_frames: 1,
        })
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Config);
}

#[test]
fn encodes_a_short_clip_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.mp4");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    let frames = (0..6u64).map(|i| {
        Ok(Frame {
            index: FrameIndex(i),
            time_secs: i as f64 / 30.0,
            raster: Raster::filled(16, 16, Rgba8::rgb(200, 40, 40)),
        })
    });
    let n = stream_frames(
        frames,
        &mut sink,
        SinkConfig {
            width: 16,
            height: 16,
            fps: Fps::default(),
            expected_frames: 6,
        },
        &RenderGuard::unbounded(CancelToken::new()),
    )
    .unwrap();
    assert_eq!(n, 6);
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}

#[test]
fn cancellation_kills_encoder_and_removes_partial_output() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cancelled.mp4");
    let token = CancelToken::new();
    let guard = RenderGuard::unbounded(token.clone());
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    let frames = (0..100u64).map(|i| {
        if i == 3 {
            token.cancel();
        }
        Ok(Frame {
            index: FrameIndex(i),
            time_secs: i as f64 / 30.0,
            raster: Raster::filled(16, 16, Rgba8::rgb(0, 0, 0)),
        })
    });
    let err = stream_frames(
        frames,
        &mut sink,
        SinkConfig {
            width: 16,
            height: 16,
            fps: Fps::default(),
            expected_frames: 100,
        },
        &guard,
    )
    .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Cancelled);
    assert!(!out.exists());
}

/// Shell script standing in for `ffmpeg`: answers `-version`, then runs `body`.
#[cfg(unix)]
fn scripted_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt as _;
    let path = dir.join("ffmpeg");
    std::fs::write(
        &path,
        format!("#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then exit 0; fi\n{body}\n"),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn timeout_kills_an_encoder_that_stopped_reading() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hung.mp4");
    let mut opts = FfmpegSinkOpts::new(&out);
    opts.program = scripted_ffmpeg(dir.path(), "exec sleep 30");
    let guard = RenderGuard::new(CancelToken::new(), 1.0);
    opts.guard = Some(guard.clone());
    let mut sink = FfmpegSink::new(opts);

    // Each frame is larger than a pipe buffer, so the first write blocks.
    let frames = (0..200u64).map(|i| {
        Ok(Frame {
            index: FrameIndex(i),
            time_secs: i as f64 / 30.0,
            raster: Raster::filled(256, 256, Rgba8::rgb(10, 20, 30)),
        })
    });
    let started = std::time::Instant::now();
    let err = stream_frames(
        frames,
        &mut sink,
        SinkConfig {
            width: 256,
            height: 256,
            fps: Fps::default(),
            expected_frames: 200,
        },
        &guard,
    )
    .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!out.exists());
}

#[cfg(unix)]
#[test]
fn encoder_exit_failure_is_an_encoder_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("failed.mp4");
    let mut opts = FfmpegSinkOpts::new(&out);
    opts.program = scripted_ffmpeg(dir.path(), "echo 'no encoder' >&2\nexit 1");
    opts.guard = Some(RenderGuard::new(CancelToken::new(), 30.0));
    let mut sink = FfmpegSink::new(opts);
    let frames = (0..4u64).map(|i| {
        Ok(Frame {
            index: FrameIndex(i),
            time_secs: i as f64 / 30.0,
            raster: Raster::filled(256, 256, Rgba8::rgb(0, 0, 0)),
        })
    });
    let err = stream_frames(
        frames,
        &mut sink,
        SinkConfig {
            width: 256,
            height: 256,
            fps: Fps::default(),
            expected_frames: 4,
        },
        &RenderGuard::unbounded(CancelToken::new()),
    )
    .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Encoder);
    assert!(err.is_retryable());
    assert!(!out.exists());
}

#[test]
fn program_comes_from_config() {
    let cfg = EncodeConfig {
        ffmpeg_program: PathBuf::from("/opt/ff/bin/ffmpeg"),
        ..EncodeConfig::default()
    };
    let opts = FfmpegSinkOpts::from_config("/tmp/o.mp4", &cfg);
    let sink_cfg = SinkConfig {
        width: 16,
        height: 16,
        fps: Fps::default(),
        expected_frames: 1,
    };
    assert_eq!(
        video_command(&sink_cfg, &opts).get_program(),
        OsStr::new("/opt/ff/bin/ffmpeg")
    );
}
