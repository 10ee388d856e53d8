//! Aspect-ratio domain: the three canonical ratios, validated dimensions, and
//! the arithmetic that classifies a source and sizes each conversion target.
//!
//! Classification compares distances exactly in integer arithmetic, so sources
//! sitting exactly between two canonical ratios resolve by the fixed
//! evaluation order Landscape, Square, Portrait.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// File extensions accepted as video sources.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpg", "mpeg",
];

/// Whether `path` has one of the [`VIDEO_EXTENSIONS`] (case-insensitive).
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// RatioTag
// ---------------------------------------------------------------------------

/// One of the three canonical aspect-ratio classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatioTag {
    /// 9:16.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1.
    #[serde(rename = "1:1")]
    Square,
    /// 16:9.
    #[serde(rename = "16:9")]
    Landscape,
}

impl RatioTag {
    /// All tags in canonical enumeration order.
    pub const ALL: [RatioTag; 3] = [RatioTag::Portrait, RatioTag::Square, RatioTag::Landscape];

    /// Evaluation order used by [`classify`]; the first minimum wins.
    const CLASSIFY_ORDER: [RatioTag; 3] =
        [RatioTag::Landscape, RatioTag::Square, RatioTag::Portrait];

    /// The ratio as an exact `(width, height)` fraction.
    pub const fn fraction(self) -> (u64, u64) {
        match self {
            Self::Portrait => (9, 16),
            Self::Square => (1, 1),
            Self::Landscape => (16, 9),
        }
    }

    /// Canonical width/height ratio.
    pub fn canonical(self) -> f64 {
        let (w, h) = self.fraction();
        w as f64 / h as f64
    }

    /// Short display label used inside file names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Portrait => "竖",
            Self::Square => "方",
            Self::Landscape => "横",
        }
    }

    /// `"9:16"`, `"1:1"` or `"16:9"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::Landscape => "16:9",
        }
    }

    /// Look a tag up by its display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for RatioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatioTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(tag) = Self::from_label(trimmed) {
            return Ok(tag);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "9:16" | "portrait" | "vertical" => Ok(Self::Portrait),
            "1:1" | "square" => Ok(Self::Square),
            "16:9" | "landscape" | "horizontal" => Ok(Self::Landscape),
            other => Err(Error::Validation(format!(
                "unknown ratio '{other}' (expected 9:16, 1:1 or 16:9)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MediaDimensions
// ---------------------------------------------------------------------------

/// Known, strictly positive pixel dimensions of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDimensions")]
pub struct MediaDimensions {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct RawDimensions {
    width: u32,
    height: u32,
}

impl TryFrom<RawDimensions> for MediaDimensions {
    type Error = Error;

    fn try_from(raw: RawDimensions) -> Result<Self> {
        Self::new(raw.width, raw.height)
    }
}

impl MediaDimensions {
    /// Validate and wrap a width/height pair.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest canonical ratio.
    pub fn ratio_tag(&self) -> RatioTag {
        nearest(self.width, self.height)
    }

    /// Output size for converting this source to `target`.
    pub fn target(&self, target: RatioTag) -> Result<(u32, u32)> {
        target_dimensions(self.width, self.height, target)
    }
}

impl fmt::Display for MediaDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What a probe backend learns about a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaProbe {
    pub dimensions: MediaDimensions,
    pub duration: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Ratio math
// ---------------------------------------------------------------------------

/// Classify `width`x`height` into the nearest canonical ratio.
///
/// # Errors
///
/// [`Error::InvalidDimensions`] if either side is zero.
pub fn classify(width: u32, height: u32) -> Result<RatioTag> {
    MediaDimensions::new(width, height).map(|d| d.ratio_tag())
}

fn nearest(width: u32, height: u32) -> RatioTag {
    let (w, h) = (i128::from(width), i128::from(height));
    // |w/h - p/q| = |w*q - p*h| / (h*q); `h` is common to every candidate, so
    // comparing |w*q - p*h| / q across candidates is exact after cross-multiplying.
    let distance = |tag: RatioTag| {
        let (p, q) = tag.fraction();
        ((w * q as i128 - p as i128 * h).abs(), q as i128)
    };

    let mut best = RatioTag::CLASSIFY_ORDER[0];
    let mut best_dist = distance(best);
    for tag in &RatioTag::CLASSIFY_ORDER[1..] {
        let dist = distance(*tag);
        if dist.0 * best_dist.1 < best_dist.0 * dist.1 {
            best = *tag;
            best_dist = dist;
        }
    }
    best
}

/// The two tags other than `tag`, in canonical enumeration order.
pub fn other_ratios(tag: RatioTag) -> [RatioTag; 2] {
    let mut out = [tag; 2];
    let mut i = 0;
    for t in RatioTag::ALL {
        if t != tag {
            out[i] = t;
            i += 1;
        }
    }
    out
}

/// Round `n` up to the next even number.
pub fn make_even(n: u64) -> u64 {
    n + (n & 1)
}

/// `round(n * num / den)`, halves rounding up.
fn scale_round(n: u64, num: u64, den: u64) -> u64 {
    (2 * n * num + den) / (2 * den)
}

/// Output size for converting an `orig_w`x`orig_h` source to `target`.
///
/// The source's extent is a floor: the governing dimension is kept and the
/// other grows to reach the target ratio. Both sides are rounded up to even.
///
/// # Errors
///
/// [`Error::InvalidDimensions`] if either input is zero or the result does
/// not fit in `u32`.
pub fn target_dimensions(orig_w: u32, orig_h: u32, target: RatioTag) -> Result<(u32, u32)> {
    MediaDimensions::new(orig_w, orig_h)?;
    let (ow, oh) = (u64::from(orig_w), u64::from(orig_h));

    let (w, h) = match target {
        RatioTag::Landscape => {
            let h = oh;
            let w = scale_round(h, 16, 9);
            if w < ow {
                (ow, scale_round(ow, 9, 16))
            } else {
                (w, h)
            }
        }
        RatioTag::Portrait => {
            let w = ow;
            let h = scale_round(w, 16, 9);
            if h < oh {
                (scale_round(oh, 9, 16), oh)
            } else {
                (w, h)
            }
        }
        RatioTag::Square => {
            let side = ow.max(oh);
            (side, side)
        }
    };

    let overflow = || Error::InvalidDimensions {
        width: orig_w,
        height: orig_h,
    };
    let w = u32::try_from(make_even(w)).map_err(|_| overflow())?;
    let h = u32::try_from(make_even(h)).map_err(|_| overflow())?;
    Ok((w, h))
}
