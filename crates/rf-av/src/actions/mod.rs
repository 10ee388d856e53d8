//! Media processing actions.

mod reframe;

pub use reframe::{
    build_filter_graph, reframe_args, EncodeSettings, FfmpegTranscoder, FilterGraph, Transcoder,
    OUTPUT_PAD,
};
