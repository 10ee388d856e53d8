//! Probe backends that shell out to external tools.
//!
//! [`FfprobeProber`] reads ffprobe's JSON report; [`BannerProber`] falls back
//! to scraping the banner ffmpeg prints when given only an input. The
//! [`FallbackProber`] chains them so that a source is only reported as
//! unreadable once every backend has given up.

pub mod banner;
pub mod ffprobe;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rf_core::{MediaDimensions, MediaProbe};

use crate::tools::ToolRegistry;

pub use self::banner::BannerProber;
pub use self::ffprobe::FfprobeProber;

/// Default bound on how long a single probe may run.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// A media prober capable of extracting the dimensions of a video file.
///
/// Implementations must be safe to share across tasks (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe a media file and report its dimensions and duration.
    async fn probe(&self, path: &Path) -> rf_core::Result<MediaProbe>;
}

/// Tries each backend in order and returns the first successful result.
pub struct FallbackProber {
    probers: Vec<Box<dyn Prober>>,
}

impl FallbackProber {
    pub fn new(probers: Vec<Box<dyn Prober>>) -> Self {
        Self { probers }
    }

    /// ffprobe first, then the ffmpeg banner, using whichever tools the
    /// registry found.
    pub fn from_registry(tools: &ToolRegistry, timeout: Duration) -> Self {
        let mut probers: Vec<Box<dyn Prober>> = Vec::new();

        if let Some(ffprobe) = tools.get("ffprobe") {
            probers.push(Box::new(
                FfprobeProber::new(ffprobe.path.clone()).with_timeout(timeout),
            ));
        }
        if let Some(ffmpeg) = tools.get("ffmpeg") {
            probers.push(Box::new(
                BannerProber::new(ffmpeg.path.clone()).with_timeout(timeout),
            ));
        }

        if probers.is_empty() {
            tracing::warn!("Neither ffprobe nor ffmpeg available; every probe will fail");
        }

        Self { probers }
    }

    pub fn len(&self) -> usize {
        self.probers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probers.is_empty()
    }
}

#[async_trait]
impl Prober for FallbackProber {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn probe(&self, path: &Path) -> rf_core::Result<MediaProbe> {
        for prober in &self.probers {
            match prober.probe(path).await {
                Ok(probe) => return Ok(probe),
                Err(e) => {
                    tracing::debug!(
                        prober = prober.name(),
                        error = %e,
                        "prober failed, trying next"
                    );
                }
            }
        }

        Err(rf_core::Error::not_readable(path))
    }
}

/// Probe `path` and return only its dimensions.
///
/// Any backend failure surfaces as [`rf_core::Error::NotReadable`].
pub async fn probe_dimensions(
    prober: &dyn Prober,
    path: &Path,
) -> rf_core::Result<MediaDimensions> {
    match prober.probe(path).await {
        Ok(probe) => Ok(probe.dimensions),
        Err(rf_core::Error::NotReadable { path }) => Err(rf_core::Error::NotReadable { path }),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "probe failed");
            Err(rf_core::Error::not_readable(path))
        }
    }
}
