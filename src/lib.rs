//! Pixreel turns an episode script into a finished pixel-art short video.
//!
//! The core is deterministic: the same script, assets, and configuration always produce the same
//! frames and the same audio samples.
//!
//! - Load and validate a [`script::model::Script`]
//! - Composite frames lazily with [`render::compositor::Compositor`]
//! - Mix music, sound effects, and typewriter blips with [`audio::mix::mix_manifest`]
//! - Encode and mux with `ffmpeg` through [`encode::ffmpeg::encode_and_mux`]
//! - Or let [`Orchestrator`] do all of the above for every render format, with retries, a
//!   quality gate, and a structured [`RenderReport`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod assets;
pub mod audio;
pub mod config;
pub mod encode;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod script;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8, Vec2};
pub use crate::foundation::error::{ErrorKind, ReelError, ReelResult};
pub use crate::foundation::math::{db_to_gain, gain_to_db};
pub use crate::foundation::warnings::{AssetKind, Component, Warning, WarningLog};

pub use crate::config::PipelineConfig;
pub use crate::encode::guard::CancelToken;
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::pipeline::orchestrator::{Orchestrator, RenderReport, RenderRequest};
pub use crate::pipeline::state::RenderState;
pub use crate::render::format::RenderFormat;
pub use crate::render::raster::{Frame, Raster};
pub use crate::script::model::Script;
