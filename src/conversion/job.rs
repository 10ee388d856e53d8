//! The worker that runs one batch to completion.

use std::path::Path;
use std::sync::Arc;

use rf_av::{build_filter_graph, probe_dimensions, Prober, Transcoder};
use rf_core::events::{EventBus, EventPayload};
use rf_core::{JobId, MediaDimensions, RatioTag};
use tracing::{debug, info, warn};

use super::registry::ProgressWriter;
use super::types::{ConversionBatch, ConversionRequest, JobProgress};
use crate::naming;

/// Per-job knobs taken from the conversion config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSettings {
    pub blur_sigma: f64,
    /// Delete every request's source once all units have run.
    pub remove_sources: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 50.0,
            remove_sources: true,
        }
    }
}

impl From<&rf_core::config::ConversionConfig> for JobSettings {
    fn from(config: &rf_core::config::ConversionConfig) -> Self {
        Self {
            blur_sigma: config.blur_sigma,
            remove_sources: config.remove_sources,
        }
    }
}

/// A registered batch plus everything needed to process it.
pub(crate) struct ConversionJob {
    pub(crate) batch: ConversionBatch,
    pub(crate) writer: ProgressWriter,
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) transcoder: Arc<dyn Transcoder>,
    pub(crate) settings: JobSettings,
    pub(crate) events: Arc<EventBus>,
}

impl ConversionJob {
    /// Process every unit in order, clean up sources, and mark the job done.
    pub(crate) async fn run(self) -> JobProgress {
        let ConversionJob {
            batch,
            writer,
            prober,
            transcoder,
            settings,
            events,
        } = self;
        let job_id = batch.job_id;

        info!(
            job_id = %job_id,
            units = batch.total_units(),
            destination = %batch.destination.display(),
            "Conversion job started"
        );

        let ctx = UnitContext {
            job_id,
            destination: &batch.destination,
            writer: &writer,
            transcoder: transcoder.as_ref(),
            blur_sigma: settings.blur_sigma,
            events: &events,
        };

        for request in &batch.items {
            let dimensions = match request.dimensions() {
                Some(dims) => Ok(dims),
                None => probe_dimensions(prober.as_ref(), request.source())
                    .await
                    .map_err(|e| e.to_string()),
            };

            for &target in request.targets() {
                ctx.begin(request, target);
                let outcome = match &dimensions {
                    Ok(dims) => ctx.run_unit(request, *dims, target).await,
                    Err(message) => Err(message.clone()),
                };

                match outcome {
                    Ok(output_name) => {
                        info!(job_id = %job_id, output = %output_name, ratio = %target, "Unit finished");
                        writer.record_success(output_name.clone(), target);
                        events.broadcast(EventPayload::UnitSucceeded {
                            job_id,
                            output_name,
                            ratio: target,
                        });
                    }
                    Err(message) => {
                        warn!(
                            job_id = %job_id,
                            source = %request.display_name(),
                            ratio = %target,
                            error = %message,
                            "Unit failed"
                        );
                        writer.record_failure(request.display_name(), target, message.clone());
                        events.broadcast(EventPayload::UnitFailed {
                            job_id,
                            source_name: request.display_name().to_string(),
                            ratio: target,
                            error: message,
                        });
                    }
                }
            }
        }

        if settings.remove_sources {
            remove_sources(job_id, &batch.items).await;
        }

        let done = writer.finish();
        info!(
            job_id = %job_id,
            succeeded = done.succeeded(),
            failed = done.failed(),
            "Conversion job done"
        );
        events.broadcast(EventPayload::JobDone {
            job_id,
            succeeded: done.succeeded(),
            failed: done.failed(),
        });
        done
    }
}

/// Borrowed state shared by every unit of one job.
struct UnitContext<'a> {
    job_id: JobId,
    destination: &'a Path,
    writer: &'a ProgressWriter,
    transcoder: &'a dyn Transcoder,
    blur_sigma: f64,
    events: &'a EventBus,
}

impl UnitContext<'_> {
    /// Publish the label of the unit about to run.
    fn begin(&self, request: &ConversionRequest, target: RatioTag) {
        let label = format!("{} → {}", request.display_name(), target.label());
        self.writer.begin_unit(label.clone());
        self.events.broadcast(EventPayload::UnitStarted {
            job_id: self.job_id,
            label,
        });
    }

    /// Run one (request, target) unit and return the output file name.
    async fn run_unit(
        &self,
        request: &ConversionRequest,
        dims: MediaDimensions,
        target: RatioTag,
    ) -> Result<String, String> {
        let (out_w, out_h) = dims.target(target).map_err(|e| e.to_string())?;
        let output = naming::output_path(self.destination, request.display_name(), target);
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let graph = build_filter_graph(out_w, out_h, self.blur_sigma);
        debug!(
            job_id = %self.job_id,
            source = %dims,
            size = %format!("{out_w}x{out_h}"),
            output = %output.display(),
            "Reframing"
        );

        self.transcoder
            .reframe(request.source(), &output, &graph)
            .await
            .map_err(|e| e.to_string())?;

        Ok(output_name)
    }
}

/// Best-effort removal of consumed sources; failures are only logged.
async fn remove_sources(job_id: JobId, items: &[ConversionRequest]) {
    for request in items {
        match tokio::fs::remove_file(request.source()).await {
            Ok(()) => debug!(job_id = %job_id, path = %request.source().display(), "Removed source"),
            Err(e) => debug!(
                job_id = %job_id,
                path = %request.source().display(),
                error = %e,
                "Source not removed"
            ),
        }
    }
}
