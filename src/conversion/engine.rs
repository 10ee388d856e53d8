//! Submission and progress-query front door.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use rf_av::{EncodeSettings, FallbackProber, FfmpegTranscoder, Prober, ToolRegistry, Transcoder};
use rf_core::config::Config;
use rf_core::events::{EventBus, EventPayload};
use rf_core::{Error, JobId, MediaDimensions, RatioTag, Result};
use serde::Serialize;

use super::job::{ConversionJob, JobSettings};
use super::registry::ProgressRegistry;
use super::types::{ConversionBatch, JobProgress};

/// Accepts batches, runs each on its own task, and answers progress queries.
#[derive(Clone)]
pub struct ConversionEngine {
    prober: Arc<dyn Prober>,
    transcoder: Arc<dyn Transcoder>,
    settings: JobSettings,
    registry: ProgressRegistry,
    events: Arc<EventBus>,
}

impl ConversionEngine {
    pub fn new(
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn Transcoder>,
        settings: JobSettings,
    ) -> Self {
        Self {
            prober,
            transcoder,
            settings,
            registry: ProgressRegistry::new(),
            events: Arc::new(EventBus::default()),
        }
    }

    /// Build an engine on the discovered ffmpeg/ffprobe.
    ///
    /// # Errors
    ///
    /// [`Error::Tool`] when ffmpeg is not available.
    pub fn from_config(config: &Config, tools: &ToolRegistry) -> Result<Self> {
        let conversion = &config.conversion;
        let prober = FallbackProber::from_registry(tools, conversion.probe_timeout());
        let transcoder = FfmpegTranscoder::from_registry(tools, EncodeSettings::from(conversion))?;

        Ok(Self::new(
            Arc::new(prober),
            Arc::new(transcoder),
            JobSettings::from(conversion),
        ))
    }

    pub fn registry(&self) -> &ProgressRegistry {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Validate and register `batch`, start it in the background, and return
    /// its ID without waiting for any unit.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when the batch has no units.
    /// - [`Error::Internal`] when no runtime is available.
    /// - [`Error::Directory`] when the destination cannot be created.
    /// - [`Error::Conflict`] when the batch's ID is already registered.
    ///
    /// No job is registered in any of these cases, and the destination is
    /// left untouched unless a runtime is available.
    pub fn submit(&self, batch: ConversionBatch) -> Result<JobId> {
        let total_units = batch.total_units();
        if total_units == 0 {
            return Err(Error::Validation("no files to process".into()));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("no async runtime to run the job on: {e}")))?;

        std::fs::create_dir_all(&batch.destination)
            .map_err(|e| Error::directory(&batch.destination, e))?;

        let job_id = batch.job_id;
        let writer = self
            .registry
            .register(job_id, total_units, batch.destination.clone())?;

        tracing::info!(
            job_id = %job_id,
            files = batch.items.len(),
            units = total_units,
            "Conversion job submitted"
        );
        self.events.broadcast(EventPayload::JobSubmitted {
            job_id,
            total_units,
        });

        let job = ConversionJob {
            batch,
            writer,
            prober: Arc::clone(&self.prober),
            transcoder: Arc::clone(&self.transcoder),
            settings: self.settings,
            events: Arc::clone(&self.events),
        };
        runtime.spawn(job.run());

        Ok(job_id)
    }

    /// Current progress of a job.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown job.
    pub fn progress(&self, job_id: JobId) -> Result<JobProgress> {
        self.registry
            .snapshot(job_id)
            .ok_or_else(|| Error::not_found("job", job_id))
    }

    /// Progress snapshots every `interval` until the job is done.
    pub fn watch(
        &self,
        job_id: JobId,
        interval: Duration,
    ) -> impl Stream<Item = JobProgress> + Send + 'static {
        self.registry.watch(job_id, interval)
    }

    /// Poll every `interval` until the job is done and return its final
    /// progress.
    pub async fn wait(&self, job_id: JobId, interval: Duration) -> Result<JobProgress> {
        loop {
            let progress = self.progress(job_id)?;
            if progress.is_done() {
                return Ok(progress);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Probe a candidate source with the engine's prober.
    pub async fn inspect(&self, path: &Path) -> Result<SourceInfo> {
        inspect_source(self.prober.as_ref(), path).await
    }
}

/// What input acceptance needs to know about a source before submitting it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub dimensions: MediaDimensions,
    pub duration_secs: Option<f64>,
    pub ratio: RatioTag,
    /// The two ratios the source is not, in canonical order.
    pub targets: [RatioTag; 2],
}

/// Probe `path`, classify it, and list the ratios it can be converted to.
///
/// # Errors
///
/// [`Error::NotReadable`] when the source cannot be probed.
pub async fn inspect_source(prober: &dyn Prober, path: &Path) -> Result<SourceInfo> {
    let probe = match prober.probe(path).await {
        Ok(probe) => probe,
        Err(Error::NotReadable { path }) => return Err(Error::NotReadable { path }),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "inspect failed");
            return Err(Error::not_readable(path));
        }
    };

    let ratio = probe.dimensions.ratio_tag();
    Ok(SourceInfo {
        dimensions: probe.dimensions,
        duration_secs: probe.duration.map(|d| d.as_secs_f64()),
        ratio,
        targets: rf_core::other_ratios(ratio),
    })
}
