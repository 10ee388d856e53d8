//! Unified error type for reframe.
//!
//! All crates funnel their failures into [`Error`]. Inside a running job every
//! error is recorded on the progress record as the failing unit's message;
//! submission-level failures are returned to the caller.

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering all failure modes in reframe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A zero width or height reached the ratio math.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Offending width.
        width: u32,
        /// Offending height.
        height: u32,
    },

    /// No probe backend could determine the source's dimensions.
    #[error("Cannot read media info: {}", path.display())]
    NotReadable {
        /// The source that could not be probed.
        path: PathBuf,
    },

    /// The transcoder exited with a non-zero status.
    #[error("Transcode error: {diagnostic}")]
    Transcode {
        /// The tool's diagnostic (stderr) output.
        diagnostic: String,
    },

    /// The destination directory could not be created.
    #[error("Cannot create output directory {}: {source}", path.display())]
    Directory {
        /// Directory that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "job").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external tool could not be found, spawned, or failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Probe output could not be interpreted.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::NotReadable`].
    pub fn not_readable(path: impl Into<PathBuf>) -> Self {
        Error::NotReadable { path: path.into() }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(diagnostic: impl Into<String>) -> Self {
        Error::Transcode {
            diagnostic: diagnostic.into(),
        }
    }

    /// Convenience constructor for [`Error::Directory`].
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Directory {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
