use clap::{Parser, Subcommand};
use rf_core::RatioTag;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reframe")]
#[command(author, version, about = "Convert videos between 9:16, 1:1 and 16:9 with a blurred background")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one or more videos and wait for the batch to finish
    Convert {
        /// Source videos
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target ratios (9:16, 1:1, 16:9 or portrait, square, landscape);
        /// defaults to the two ratios each source is not
        #[arg(long, value_delimiter = ',')]
        to: Vec<RatioTag>,

        /// Destination directory (defaults to conversion.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Delete the source files once the batch has finished
        #[arg(long)]
        remove_sources: bool,
    },

    /// Probe a video and show its size, ratio and conversion targets
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ratio and output sizes for a width and height
    Dims {
        width: u32,
        height: u32,

        /// Only show this target ratio
        #[arg(long)]
        to: Option<RatioTag>,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// List converted videos in the output directory
    List {
        /// Directory to list (defaults to conversion.output_dir)
        dir: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
