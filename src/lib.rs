//! reframe - batch aspect-ratio conversion with blurred-background compositing
//!
//! This library crate exposes the conversion engine for the CLI and for
//! integration testing.

pub mod conversion;
pub mod naming;
