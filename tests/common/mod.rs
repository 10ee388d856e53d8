//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`ConversionEngine`] to an
//! in-memory [`FakeProber`] and a [`FakeTranscoder`] that writes placeholder
//! outputs instead of running ffmpeg. Sources and the destination live in a
//! temporary directory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use reframe::conversion::{ConversionEngine, JobProgress, JobSettings};
use rf_av::{FilterGraph, Prober, Transcoder};
use rf_core::events::{Event, EventPayload};
use rf_core::{JobId, MediaDimensions, MediaProbe};

/// Poll interval used by tests.
pub const POLL: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// FakeProber
// ---------------------------------------------------------------------------

/// Prober answering from a table of known paths; anything else is unreadable.
#[derive(Default)]
pub struct FakeProber {
    known: Mutex<HashMap<PathBuf, MediaDimensions>>,
    calls: AtomicUsize,
}

impl FakeProber {
    pub fn insert(&self, path: &Path, width: u32, height: u32) {
        let dims = MediaDimensions::new(width, height).unwrap();
        self.known.lock().insert(path.to_path_buf(), dims);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> rf_core::Result<MediaProbe> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.known.lock().get(path) {
            Some(dims) => Ok(MediaProbe {
                dimensions: *dims,
                duration: Some(Duration::from_secs(10)),
            }),
            None => Err(rf_core::Error::Probe("no video stream".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeTranscoder
// ---------------------------------------------------------------------------

/// One recorded transcoder invocation.
#[derive(Debug, Clone)]
pub struct TranscodeCall {
    pub input: PathBuf,
    pub output: PathBuf,
    pub graph: FilterGraph,
}

/// Transcoder that writes a placeholder output, or fails like ffmpeg would
/// when the output name contains `fail_on`.
#[derive(Default)]
pub struct FakeTranscoder {
    calls: Mutex<Vec<TranscodeCall>>,
    fail_on: Mutex<Option<String>>,
    delay: Mutex<Duration>,
}

impl FakeTranscoder {
    pub fn fail_when_output_contains(&self, needle: &str) {
        *self.fail_on.lock() = Some(needle.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<TranscodeCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn reframe(
        &self,
        input: &Path,
        output: &Path,
        graph: &FilterGraph,
    ) -> rf_core::Result<()> {
        self.calls.lock().push(TranscodeCall {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            graph: graph.clone(),
        });

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let name = output.to_string_lossy().into_owned();
        let fail = self
            .fail_on
            .lock()
            .as_deref()
            .is_some_and(|needle| name.contains(needle));
        if fail {
            return Err(rf_core::Error::transcode("invalid codec"));
        }

        tokio::fs::write(output, b"reframed").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub dir: TempDir,
    pub prober: Arc<FakeProber>,
    pub transcoder: Arc<FakeTranscoder>,
    pub engine: ConversionEngine,
}

impl TestHarness {
    /// Harness with default job settings (sources removed afterwards).
    pub fn new() -> Self {
        Self::with_settings(JobSettings::default())
    }

    pub fn with_settings(settings: JobSettings) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("in")).expect("failed to create input dir");

        let prober = Arc::new(FakeProber::default());
        let transcoder = Arc::new(FakeTranscoder::default());
        let engine = ConversionEngine::new(prober.clone(), transcoder.clone(), settings);

        Self {
            dir,
            prober,
            transcoder,
            engine,
        }
    }

    /// Destination directory for outputs (not created up front).
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Write a source file the prober knows the size of.
    pub fn source(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.unreadable_source(name);
        self.prober.insert(&path, width, height);
        path
    }

    /// Write a source file the prober cannot read.
    pub fn unreadable_source(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("in").join(name);
        std::fs::write(&path, b"source").expect("failed to write source");
        path
    }

    /// Wait for a job to finish, failing the test after a few seconds.
    pub async fn wait(&self, job_id: JobId) -> JobProgress {
        tokio::time::timeout(Duration::from_secs(10), self.engine.wait(job_id, POLL))
            .await
            .expect("job did not finish in time")
            .expect("job vanished from the registry")
    }

    /// Collect this job's events up to and including `JobDone`.
    pub async fn events_until_done(
        rx: &mut tokio::sync::broadcast::Receiver<Event>,
        job_id: JobId,
    ) -> Vec<EventPayload> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out waiting for events")
                .expect("event bus closed");
            if event.payload.job_id() != job_id {
                continue;
            }
            let done = matches!(event.payload, EventPayload::JobDone { .. });
            seen.push(event.payload);
            if done {
                return seen;
            }
        }
    }
}
