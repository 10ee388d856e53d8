//! Process-wide table of live job progress.
//!
//! Each job's record sits behind its own lock. Exactly one [`ProgressWriter`]
//! exists per job; any number of readers take cloned snapshots. Entries are
//! never evicted here: callers that want retention limits use
//! [`ProgressRegistry::remove`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::Stream;
use parking_lot::RwLock;
use rf_core::{JobId, RatioTag};

use super::types::{JobProgress, JobStatus, UnitFailure, UnitOutput};

/// Shared handle to the progress table. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    jobs: Arc<DashMap<JobId, Arc<RwLock<JobProgress>>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Processing` record for `job_id` and hand back its writer.
    ///
    /// # Errors
    ///
    /// [`rf_core::Error::Conflict`] if the ID is already registered.
    pub fn register(
        &self,
        job_id: JobId,
        total_units: u32,
        destination: PathBuf,
    ) -> rf_core::Result<ProgressWriter> {
        use dashmap::mapref::entry::Entry;

        match self.jobs.entry(job_id) {
            Entry::Occupied(_) => Err(rf_core::Error::Conflict(format!(
                "job {job_id} is already registered"
            ))),
            Entry::Vacant(slot) => {
                let record = Arc::new(RwLock::new(JobProgress::new(
                    job_id,
                    total_units,
                    destination,
                )));
                slot.insert(Arc::clone(&record));
                Ok(ProgressWriter {
                    job_id,
                    record,
                    finished: false,
                })
            }
        }
    }

    /// A copy of the job's current progress, or `None` if unknown.
    pub fn snapshot(&self, job_id: JobId) -> Option<JobProgress> {
        let record = self.jobs.get(&job_id).map(|r| Arc::clone(r.value()))?;
        let progress = record.read().clone();
        Some(progress)
    }

    /// Poll the job every `interval`, yielding each snapshot up to and
    /// including the first `Done` one. Ends at once for an unknown job.
    pub fn watch(
        &self,
        job_id: JobId,
        interval: Duration,
    ) -> impl Stream<Item = JobProgress> + Send + 'static {
        let registry = self.clone();
        let period = interval.max(Duration::from_millis(1));

        async_stream::stream! {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(snapshot) = registry.snapshot(job_id) else {
                    break;
                };
                let done = snapshot.is_done();
                yield snapshot;
                if done {
                    break;
                }
            }
        }
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop a job's record. A running job keeps writing to its detached
    /// record; readers just stop seeing it.
    pub fn remove(&self, job_id: JobId) -> Option<JobProgress> {
        self.jobs
            .remove(&job_id)
            .map(|(_, record)| record.read().clone())
    }
}

/// The single writer for one job's progress record.
///
/// Every `record_*` call appends its entry and bumps `completed_units` under
/// one write lock, so readers never see the two out of step.
#[derive(Debug)]
pub struct ProgressWriter {
    job_id: JobId,
    record: Arc<RwLock<JobProgress>>,
    finished: bool,
}

impl ProgressWriter {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Set the label of the unit about to run.
    pub fn begin_unit(&self, label: impl Into<String>) {
        self.record.write().current_item = Some(label.into());
    }

    pub fn record_success(&self, output_name: impl Into<String>, ratio: RatioTag) {
        let mut progress = self.record.write();
        progress.results.push(UnitOutput {
            output_name: output_name.into(),
            ratio,
            label: ratio.label().to_string(),
        });
        bump(&mut progress);
    }

    pub fn record_failure(
        &self,
        source_name: impl Into<String>,
        ratio: RatioTag,
        message: impl Into<String>,
    ) {
        let mut progress = self.record.write();
        progress.errors.push(UnitFailure {
            source_name: source_name.into(),
            ratio,
            message: message.into(),
        });
        bump(&mut progress);
    }

    /// Mark the job `Done` and return the final snapshot. No writes are
    /// possible afterwards.
    pub fn finish(mut self) -> JobProgress {
        self.finished = true;
        close(&self.record)
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(job_id = %self.job_id, "progress writer dropped early; marking job done");
            close(&self.record);
        }
    }
}

fn bump(progress: &mut JobProgress) {
    debug_assert!(progress.completed_units < progress.total_units);
    progress.completed_units += 1;
}

fn close(record: &RwLock<JobProgress>) -> JobProgress {
    let mut progress = record.write();
    progress.status = JobStatus::Done;
    progress.current_item = None;
    progress.finished_at = Some(Utc::now());
    progress.clone()
}
