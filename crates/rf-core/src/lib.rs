//! rf-core: shared types, ratio math, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for the other reframe crates,
//! providing the aspect-ratio domain ([`RatioTag`], [`MediaDimensions`] and
//! the arithmetic over them), a unified error type, typed job identifiers,
//! application configuration, and a broadcast event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
