//! # rf-av
//!
//! External tool plumbing for reframe.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with optional
//!   timeout for running external processes.
//! - **Probe backends** ([`probe::FfprobeProber`], [`probe::BannerProber`],
//!   [`probe::FallbackProber`]) -- read a source's dimensions and duration.
//! - **Reframing** ([`actions`]) -- the blurred-background filter graph and
//!   the [`Transcoder`] that renders it.

pub mod actions;
pub mod command;
pub mod probe;
pub mod tools;

pub use actions::{
    build_filter_graph, reframe_args, EncodeSettings, FfmpegTranscoder, FilterGraph, Transcoder,
    OUTPUT_PAD,
};
pub use command::{ToolCommand, ToolOutput};
pub use probe::{probe_dimensions, BannerProber, FallbackProber, FfprobeProber, Prober};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
