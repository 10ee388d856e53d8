//! Batch, request and progress types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rf_core::{JobId, MediaDimensions, RatioTag};
use serde::{Deserialize, Serialize};

/// One source file and the ratios it should be converted to.
///
/// Targets form an ordered set: every constructor, deserialization included,
/// drops repeated ratios and keeps the first occurrence of each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RequestFields")]
pub struct ConversionRequest {
    source: PathBuf,
    display_name: String,
    targets: Vec<RatioTag>,
    dimensions: Option<MediaDimensions>,
}

/// Wire shape of [`ConversionRequest`] before target de-duplication.
#[derive(Deserialize)]
struct RequestFields {
    source: PathBuf,
    display_name: String,
    #[serde(default)]
    targets: Vec<RatioTag>,
    #[serde(default)]
    dimensions: Option<MediaDimensions>,
}

impl From<RequestFields> for ConversionRequest {
    fn from(fields: RequestFields) -> Self {
        let request = Self::new(fields.source, fields.display_name, fields.targets);
        match fields.dimensions {
            Some(dims) => request.with_dimensions(dims),
            None => request,
        }
    }
}

impl ConversionRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        display_name: impl Into<String>,
        targets: impl IntoIterator<Item = RatioTag>,
    ) -> Self {
        let mut unique = Vec::with_capacity(RatioTag::ALL.len());
        for tag in targets {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        Self {
            source: source.into(),
            display_name: display_name.into(),
            targets: unique,
            dimensions: None,
        }
    }

    /// Attach dimensions that are already known so the job skips probing.
    pub fn with_dimensions(mut self, dimensions: MediaDimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Convert a source to the two ratios it is not.
    pub fn for_other_ratios(
        source: impl Into<PathBuf>,
        display_name: impl Into<String>,
        dimensions: MediaDimensions,
    ) -> Self {
        let targets = rf_core::other_ratios(dimensions.ratio_tag());
        Self::new(source, display_name, targets).with_dimensions(dimensions)
    }

    /// Local path of the readable source.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Name the source was submitted under; output names derive from it.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Target ratios in processing order.
    pub fn targets(&self) -> &[RatioTag] {
        &self.targets
    }

    /// Known dimensions; probed when absent.
    pub fn dimensions(&self) -> Option<MediaDimensions> {
        self.dimensions
    }
}

/// An ordered set of requests sharing a destination directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionBatch {
    pub job_id: JobId,
    pub items: Vec<ConversionRequest>,
    pub destination: PathBuf,
}

impl ConversionBatch {
    /// Create a batch with a fresh job ID.
    pub fn new(items: Vec<ConversionRequest>, destination: impl Into<PathBuf>) -> Self {
        Self {
            job_id: JobId::new(),
            items,
            destination: destination.into(),
        }
    }

    /// Number of (request, target) units in the batch.
    pub fn total_units(&self) -> u32 {
        self.items
            .iter()
            .map(|r| r.targets.len() as u32)
            .sum()
    }
}

/// Job lifecycle state. There is no failed state: a job whose every unit
/// failed is still `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
}

/// A unit that produced an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutput {
    pub output_name: String,
    pub ratio: RatioTag,
    /// Display label of `ratio`.
    pub label: String,
}

/// A unit that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Display name of the request the unit belonged to.
    pub source_name: String,
    pub ratio: RatioTag,
    pub message: String,
}

/// Snapshot of a job's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total_units: u32,
    pub completed_units: u32,
    /// `"<display name> → <label>"` of the unit being processed.
    pub current_item: Option<String>,
    pub results: Vec<UnitOutput>,
    pub errors: Vec<UnitFailure>,
    pub destination: PathBuf,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobProgress {
    pub(crate) fn new(job_id: JobId, total_units: u32, destination: PathBuf) -> Self {
        Self {
            job_id,
            status: JobStatus::Processing,
            total_units,
            completed_units: 0,
            current_item: None,
            results: Vec::new(),
            errors: Vec::new(),
            destination,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Done
    }

    pub fn succeeded(&self) -> u32 {
        self.results.len() as u32
    }

    pub fn failed(&self) -> u32 {
        self.errors.len() as u32
    }

    /// Fraction of units completed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            return 1.0;
        }
        f64::from(self.completed_units) / f64::from(self.total_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_dedups_targets_in_order() {
        let req = ConversionRequest::new(
            "/tmp/a.mp4",
            "a.mp4",
            [
                RatioTag::Square,
                RatioTag::Portrait,
                RatioTag::Square,
                RatioTag::Portrait,
            ],
        );
        assert_eq!(req.targets(), [RatioTag::Square, RatioTag::Portrait]);
        assert!(req.dimensions().is_none());
    }

    #[test]
    fn deserialized_request_dedups_targets() {
        let req: ConversionRequest = serde_json::from_value(serde_json::json!({
            "source": "/uploads/clip.mp4",
            "display_name": "clip.mp4",
            "targets": ["9:16", "9:16", "1:1", "9:16"],
        }))
        .unwrap();
        assert_eq!(req.targets(), [RatioTag::Portrait, RatioTag::Square]);
        assert_eq!(req.display_name(), "clip.mp4");
        assert_eq!(req.source(), Path::new("/uploads/clip.mp4"));
        assert!(req.dimensions().is_none());
    }

    #[test]
    fn deserialized_batch_counts_unique_units() {
        let batch: ConversionBatch = serde_json::from_value(serde_json::json!({
            "job_id": JobId::new(),
            "items": [{
                "source": "/uploads/clip.mp4",
                "display_name": "clip.mp4",
                "targets": ["9:16", "9:16"],
                "dimensions": { "width": 1920, "height": 1080 },
            }],
            "destination": "/out",
        }))
        .unwrap();
        assert_eq!(batch.total_units(), 1);
        assert_eq!(
            batch.items[0].dimensions(),
            Some(MediaDimensions::new(1920, 1080).unwrap())
        );
    }

    #[test]
    fn request_serializes_its_fields() {
        let req = ConversionRequest::new("/in/a.mp4", "a.mp4", [RatioTag::Landscape]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["targets"], serde_json::json!(["16:9"]));
        let back: ConversionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn other_ratios_request() {
        let dims = MediaDimensions::new(1920, 1080).unwrap();
        let req = ConversionRequest::for_other_ratios("/tmp/b.mp4", "b.mp4", dims);
        assert_eq!(req.targets(), [RatioTag::Portrait, RatioTag::Square]);
        assert_eq!(req.dimensions(), Some(dims));
    }

    #[test]
    fn total_units_sums_targets() {
        let batch = ConversionBatch::new(
            vec![
                ConversionRequest::new("a", "a", [RatioTag::Square, RatioTag::Landscape]),
                ConversionRequest::new("b", "b", [RatioTag::Portrait]),
                ConversionRequest::new("c", "c", Vec::<RatioTag>::new()),
            ],
            "/tmp/out",
        );
        assert_eq!(batch.total_units(), 3);
    }

    #[test]
    fn batches_get_distinct_ids() {
        let a = ConversionBatch::new(Vec::new(), "/tmp");
        let b = ConversionBatch::new(Vec::new(), "/tmp");
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(a.total_units(), 0);
    }

    #[test]
    fn fresh_progress() {
        let p = JobProgress::new(JobId::new(), 4, PathBuf::from("/out"));
        assert_eq!(p.status, JobStatus::Processing);
        assert_eq!(p.completed_units, 0);
        assert!(!p.is_done());
        assert_eq!(p.fraction(), 0.0);
        assert!(p.finished_at.is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), "\"processing\"");
        assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"done\"");
    }

    #[test]
    fn progress_json_shape() {
        let mut p = JobProgress::new(JobId::new(), 1, PathBuf::from("/out"));
        p.results.push(UnitOutput {
            output_name: "clip_竖.mp4".into(),
            ratio: RatioTag::Portrait,
            label: "竖".into(),
        });
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["results"][0]["ratio"], "9:16");
        assert_eq!(json["results"][0]["output_name"], "clip_竖.mp4");
    }
}
