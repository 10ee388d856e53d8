//! Blurred-background reframing using ffmpeg.
//!
//! The source is scaled up to cover the target canvas, cropped and blurred to
//! form the background, then scaled down to fit and overlaid centered on top.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Label of the composited output pad in the filter graph.
pub const OUTPUT_PAD: &str = "[out]";

/// A textual ffmpeg `-filter_complex` graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph(String);

impl FilterGraph {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the compositing graph for an `out_w`x`out_h` canvas.
pub fn build_filter_graph(out_w: u32, out_h: u32, blur_sigma: f64) -> FilterGraph {
    let bg = format!(
        "[0:v]scale={out_w}:{out_h}:force_original_aspect_ratio=increase,\
         crop={out_w}:{out_h},gblur=sigma={blur_sigma}[bg]"
    );
    let fg = format!("[0:v]scale={out_w}:{out_h}:force_original_aspect_ratio=decrease[fg]");
    let overlay = format!("[bg][fg]overlay=(W-w)/2:(H-h)/2{OUTPUT_PAD}");
    FilterGraph(format!("{bg};{fg};{overlay}"))
}

/// Encoder settings applied to every reframed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub crf: u32,
    pub preset: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            crf: 18,
            preset: "medium".into(),
        }
    }
}

impl From<&rf_core::config::ConversionConfig> for EncodeSettings {
    fn from(config: &rf_core::config::ConversionConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
        }
    }
}

/// ffmpeg arguments for one reframe: video from the graph, audio copied when
/// present, MP4 index at the front.
pub fn reframe_args(
    input: &Path,
    output: &Path,
    graph: &FilterGraph,
    settings: &EncodeSettings,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into()];
    args.push(input.to_string_lossy().into_owned());
    args.extend(["-filter_complex".into(), graph.to_string()]);
    args.extend(["-map".into(), OUTPUT_PAD.into(), "-map".into(), "0:a?".into()]);
    args.extend([
        "-c:v".into(),
        settings.video_codec.clone(),
        "-crf".into(),
        settings.crf.to_string(),
        "-preset".into(),
        settings.preset.clone(),
    ]);
    args.extend(["-c:a".into(), "copy".into()]);
    args.extend(["-movflags".into(), "+faststart".into()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Something that can render a filter graph from an input file to an output
/// file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn reframe(&self, input: &Path, output: &Path, graph: &FilterGraph)
        -> rf_core::Result<()>;
}

/// [`Transcoder`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    settings: EncodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: PathBuf, settings: EncodeSettings) -> Self {
        Self {
            ffmpeg_path,
            settings,
        }
    }

    /// Use the ffmpeg found by the registry.
    pub fn from_registry(tools: &ToolRegistry, settings: EncodeSettings) -> rf_core::Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::new(ffmpeg.path.clone(), settings))
    }

    fn command(&self, input: &Path, output: &Path, graph: &FilterGraph) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.no_timeout();
        cmd.args(reframe_args(input, output, graph, &self.settings));
        cmd
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn reframe(
        &self,
        input: &Path,
        output: &Path,
        graph: &FilterGraph,
    ) -> rf_core::Result<()> {
        tracing::info!(
            "Reframe encode: {:?} -> {:?} (codec={}, crf={}, preset={})",
            input,
            output,
            self.settings.video_codec,
            self.settings.crf,
            self.settings.preset,
        );

        let result = self.command(input, output, graph).output().await?;

        if !result.status.success() {
            return Err(rf_core::Error::transcode(result.stderr.trim()));
        }

        Ok(())
    }
}
