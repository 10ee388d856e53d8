//! Fallback prober that reads the stream banner ffmpeg prints for `-i`.
//!
//! `ffmpeg -i <input>` without an output exits non-zero after describing the
//! input on stderr, so the exit status is ignored and only the text matters.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use rf_core::{MediaDimensions, MediaProbe};

use super::{Prober, DEFAULT_PROBE_TIMEOUT};
use crate::command::ToolCommand;

static VIDEO_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream.*Video.*?(\d{2,5})x(\d{2,5})").expect("video size pattern is valid")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d+):(\d+\.\d+)").expect("duration pattern is valid")
});

/// A prober backed by ffmpeg's input banner.
#[derive(Debug, Clone)]
pub struct BannerProber {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl BannerProber {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Prober for BannerProber {
    fn name(&self) -> &'static str {
        "ffmpeg-banner"
    }

    async fn probe(&self, path: &Path) -> rf_core::Result<MediaProbe> {
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-hide_banner", "-i"]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.output().await?;
        parse_banner(&output.stderr)
    }
}

/// Read dimensions and duration from the banner `ffmpeg -i` prints to stderr.
pub fn parse_banner(text: &str) -> rf_core::Result<MediaProbe> {
    let (width, height) = parse_dimensions(text)
        .ok_or_else(|| rf_core::Error::Probe("no video size in ffmpeg output".into()))?;

    Ok(MediaProbe {
        dimensions: MediaDimensions::new(width, height)?,
        duration: parse_duration(text),
    })
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    VIDEO_SIZE.captures(text).and_then(|cap| {
        let width = cap.get(1)?.as_str().parse().ok()?;
        let height = cap.get(2)?.as_str().parse().ok()?;
        Some((width, height))
    })
}

fn parse_duration(text: &str) -> Option<Duration> {
    let cap = DURATION.captures(text)?;
    let hours: f64 = cap.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = cap.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = cap.get(3)?.as_str().parse().ok()?;
    Some(Duration::from_secs_f64(hours * 3600.0 + minutes * 60.0 + seconds))
}
