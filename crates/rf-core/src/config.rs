//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool and conversion sections. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// x264 speed presets accepted by [`Config::validate`].
const KNOWN_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let conv = &self.conversion;

        if conv.blur_sigma.is_nan() || conv.blur_sigma <= 0.0 {
            warnings.push(format!(
                "conversion.blur_sigma is {}; the background will not be blurred",
                conv.blur_sigma
            ));
        }

        if conv.crf > 51 {
            warnings.push(format!(
                "conversion.crf {} is outside the x264 range 0-51",
                conv.crf
            ));
        }

        if conv.video_codec == "libx264" && !KNOWN_PRESETS.contains(&conv.preset.as_str()) {
            warnings.push(format!(
                "conversion.preset '{}' is not a recognized x264 preset (valid: {})",
                conv.preset,
                KNOWN_PRESETS.join(", ")
            ));
        }

        if conv.poll_interval_ms == 0 {
            warnings.push("conversion.poll_interval_ms is 0; progress polling will spin".into());
        }

        if conv.probe_timeout_secs == 0 {
            warnings.push("conversion.probe_timeout_secs is 0; every probe will time out".into());
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Conversion defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Destination used when the caller does not name one.
    pub output_dir: PathBuf,
    /// Gaussian blur sigma applied to the background layer.
    pub blur_sigma: f64,
    pub video_codec: String,
    pub crf: u32,
    pub preset: String,
    /// Delete each batch's sources once all of its units have run.
    pub remove_sources: bool,
    pub probe_timeout_secs: u64,
    /// Progress polling interval for interactive callers.
    pub poll_interval_ms: u64,
}

impl ConversionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            blur_sigma: 50.0,
            video_codec: "libx264".into(),
            crf: 18,
            preset: "medium".into(),
            remove_sources: true,
            probe_timeout_secs: 30,
            poll_interval_ms: 500,
        }
    }
}
