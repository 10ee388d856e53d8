//! Conversion job engine.
//!
//! A [`ConversionBatch`] of requests (one source, one or more target ratios
//! each) is submitted to the [`ConversionEngine`], which registers a progress
//! record and runs the batch on its own task:
//!
//! - units run strictly one after another within a job
//! - a failed unit is recorded and the job moves on
//! - every job ends `Done`, however many units failed
//!
//! Progress is read out-of-band through [`ProgressRegistry`] snapshots.

mod engine;
mod job;
mod registry;
mod types;

pub use engine::{inspect_source, ConversionEngine, SourceInfo};
pub use job::JobSettings;
pub use registry::{ProgressRegistry, ProgressWriter};
pub use types::{
    ConversionBatch, ConversionRequest, JobProgress, JobStatus, UnitFailure, UnitOutput,
};
